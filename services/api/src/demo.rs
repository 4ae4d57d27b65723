use crate::infra::RecordingNotificationPublisher;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use leasehold::config::MarketplaceConfig;
use leasehold::error::AppError;
use leasehold::marketplace::{
    Address, Caller, ConfirmDeal, DealReceipt, FixedClock, Furnishing, GeoPoint,
    InMemoryMarketplaceStore, LeadLabel, LeadStage, MarketplaceError, MarketplaceService,
    NewProperty, Notification, PropertyId, PropertyStatus, UserId,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Pin the demo clock to this date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Monthly rent agreed in the demo deal.
    #[arg(long, default_value_t = 20_000)]
    pub(crate) rent: u64,
    /// Print the receipt and notifications as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

/// Outcome of one expected-to-fail step in the walkthrough.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RejectedStep {
    pub(crate) action: &'static str,
    pub(crate) kind: &'static str,
    pub(crate) message: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DemoSummary {
    pub(crate) receipt: DealReceipt,
    pub(crate) final_status: PropertyStatus,
    pub(crate) rejected: Vec<RejectedStep>,
    pub(crate) notifications: Vec<Notification>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let json = args.json;
    let summary = walkthrough(args)?;

    println!("\nRejected steps");
    for step in &summary.rejected {
        println!("- {} -> {} ({})", step.action, step.kind, step.message);
    }

    println!("\nNotifications");
    for notification in &summary.notifications {
        println!(
            "- {:?} to {}: {}",
            notification.kind, notification.recipient, notification.message
        );
    }
    println!("\nListing ends as {}", summary.final_status);

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("\n{payload}"),
            Err(err) => println!("\nSummary payload unavailable: {err}"),
        }
    }
    Ok(())
}

pub(crate) fn walkthrough(args: DemoArgs) -> Result<DemoSummary, AppError> {
    let now = demo_instant(args.today);
    let notifier = Arc::new(RecordingNotificationPublisher::default());
    let service = MarketplaceService::new(
        Arc::new(InMemoryMarketplaceStore::new()),
        notifier.clone(),
        MarketplaceConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(now)));

    let owner = Caller::owner("owner-asha");
    let tenant = Caller::tenant("tenant-ravi");
    let mut rejected = Vec::new();

    println!("Leasehold marketplace demo ({})", now.date_naive());
    let listing = service.create_property(&owner, demo_listing())?;
    println!(
        "- {} listed '{}' at {} / month -> {}",
        owner.user_id, listing.title, listing.price, listing.status
    );

    let lead = service.record_contact(&tenant, &listing.id)?;
    service.set_lead_label(&owner, &lead.id, LeadLabel::Hot)?;
    service.add_lead_note(&owner, &lead.id, "Called back, viewing on Saturday")?;
    let lead = service.set_lead_stage(&owner, &lead.id, LeadStage::ViewingScheduled, None)?;
    println!(
        "- {} enquired; lead {} is {:?} / {:?}",
        tenant.user_id, lead.id, lead.label, lead.stage
    );

    record(
        &mut rejected,
        "confirm while available",
        service.confirm_deal(&owner, deal_terms(&listing.id, &tenant.user_id, args.rent)),
    );

    for status in [PropertyStatus::InDiscussion, PropertyStatus::Approved] {
        let moved = service.change_status(&owner, &listing.id, status)?;
        println!("- listing moved to {}", moved.status);
    }

    let receipt =
        service.confirm_deal(&owner, deal_terms(&listing.id, &tenant.user_id, args.rent))?;
    println!(
        "- deal {} confirmed with {} at {} / month",
        receipt.receipt_id, receipt.tenant_id, receipt.lease.agreed_rent
    );

    record(
        &mut rejected,
        "confirm the same listing again",
        service.confirm_deal(
            &owner,
            deal_terms(&listing.id, &UserId("tenant-meera".to_string()), args.rent),
        ),
    );

    let cancelled = service.cancel_deal(
        &owner,
        &receipt.receipt_id,
        Some("tenant withdrew".to_string()),
    )?;
    let reopened = service.get_property(Some(&owner), &listing.id)?;
    println!(
        "- deal {} {}; listing back to {} (available: {})",
        cancelled.receipt_id,
        cancelled.status.label(),
        reopened.status,
        reopened.available
    );

    record(
        &mut rejected,
        "cancel twice",
        service.cancel_deal(&owner, &receipt.receipt_id, None),
    );

    service.change_status(&owner, &listing.id, PropertyStatus::Archived)?;
    record(
        &mut rejected,
        "archived -> rented",
        service.change_status(&owner, &listing.id, PropertyStatus::Rented),
    );
    let final_status = service.get_property(Some(&owner), &listing.id)?.status;

    Ok(DemoSummary {
        receipt: cancelled,
        final_status,
        rejected,
        notifications: notifier.events(),
    })
}

fn record<T>(
    rejected: &mut Vec<RejectedStep>,
    action: &'static str,
    result: Result<T, MarketplaceError>,
) {
    match result {
        Ok(_) => println!("- {action}: unexpectedly accepted"),
        Err(err) => rejected.push(RejectedStep {
            action,
            kind: err.kind(),
            message: err.to_string(),
        }),
    }
}

fn demo_instant(today: Option<NaiveDate>) -> DateTime<Utc> {
    today
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}

fn demo_listing() -> NewProperty {
    NewProperty {
        title: "Sunlit 2BHK in Indiranagar".to_string(),
        description: "Third floor, lift, covered parking".to_string(),
        address: Address {
            line: "14, 12th Main Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560038".to_string(),
        },
        location: GeoPoint {
            lat: 12.9719,
            lng: 77.6412,
        },
        price: 24_000,
        bedrooms: 2,
        bathrooms: 2,
        area_sqft: 1_100,
        furnishing: Furnishing::SemiFurnished,
        images: Vec::new(),
    }
}

fn deal_terms(property_id: &PropertyId, tenant: &UserId, rent: u64) -> ConfirmDeal {
    ConfirmDeal {
        property_id: property_id.clone(),
        tenant_id: tenant.clone(),
        agreed_rent: rent,
        security_deposit: Some(rent.saturating_mul(3)),
        lease_start_date: None,
        lease_duration_months: Some(11),
        notes: None,
        terms: Some("Eleven month lease, one month notice".to_string()),
    }
}
