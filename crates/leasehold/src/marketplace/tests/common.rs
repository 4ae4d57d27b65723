use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::clock::FixedClock;
use crate::marketplace::domain::{
    Address, Caller, DealReceipt, Furnishing, GeoPoint, Lead, LeadId, LeadKey, LeaseTerms,
    Property, PropertyId, PropertyStatus, ReceiptStatus, UserId,
};
use crate::marketplace::extract::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::marketplace::notifications::{
    Notification, NotificationError, NotificationKind, NotificationPublisher,
};
use crate::marketplace::receipts::ReceiptId;
use crate::marketplace::repository::{
    LeadFilter, MarketplaceStore, PropertyFilter, ReceiptFilter, RepositoryError, Visibility,
    WriteBatch,
};
use crate::marketplace::requests::{ConfirmDeal, NewProperty};
use crate::marketplace::{InMemoryMarketplaceStore, MarketplaceService};

pub(crate) const OWNER: &str = "owner-1";
pub(crate) const TENANT: &str = "tenant-1";

pub(crate) fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn later(minutes: i64) -> DateTime<Utc> {
    timestamp() + Duration::minutes(minutes)
}

pub(crate) fn owner() -> Caller {
    Caller::owner(OWNER)
}

pub(crate) fn tenant() -> Caller {
    Caller::tenant(TENANT)
}

pub(crate) fn admin() -> Caller {
    Caller::admin("admin-1")
}

pub(crate) fn address(city: &str) -> Address {
    Address {
        line: "12 Lake View Road".to_string(),
        city: city.to_string(),
        state: "Karnataka".to_string(),
        postal_code: "560034".to_string(),
    }
}

/// Koramangala, Bengaluru.
pub(crate) fn bengaluru() -> GeoPoint {
    GeoPoint {
        lat: 12.9352,
        lng: 77.6245,
    }
}

pub(crate) fn new_property() -> NewProperty {
    NewProperty {
        title: "Two bedroom flat near the lake".to_string(),
        description: "Second floor, covered parking".to_string(),
        address: address("Bengaluru"),
        location: bengaluru(),
        price: 32_000,
        bedrooms: 2,
        bathrooms: 2,
        area_sqft: 1_150,
        furnishing: Furnishing::SemiFurnished,
        images: vec!["https://cdn.example.com/prop/1.jpg".to_string()],
    }
}

pub(crate) fn property_with_status(status: PropertyStatus) -> Property {
    let rented = status == PropertyStatus::Rented;
    let archived = status == PropertyStatus::Archived;
    let draft = new_property();
    Property {
        id: PropertyId("prop-1".to_string()),
        owner: UserId(OWNER.to_string()),
        title: draft.title,
        description: draft.description,
        address: draft.address,
        location: draft.location,
        price: draft.price,
        bedrooms: draft.bedrooms,
        bathrooms: draft.bathrooms,
        area_sqft: draft.area_sqft,
        furnishing: draft.furnishing,
        status,
        available: !rented && !archived,
        confirmed_tenant: rented.then(|| UserId(TENANT.to_string())),
        rented_at: rented.then(timestamp),
        archived_at: archived.then(timestamp),
        deleted: false,
        deleted_at: None,
        deleted_by: None,
        hidden: false,
        hidden_at: None,
        hidden_reason: None,
        images: draft.images,
        ratings: Vec::new(),
        created_at: timestamp(),
        updated_at: timestamp(),
        version: 0,
    }
}

pub(crate) fn confirmed_receipt(property: &Property, sequence: u32) -> DealReceipt {
    DealReceipt {
        receipt_id: ReceiptId::format(2026, sequence),
        property_id: property.id.clone(),
        owner_id: property.owner.clone(),
        tenant_id: UserId(format!("tenant-{sequence}")),
        snapshot: property.snapshot(),
        lease: LeaseTerms {
            agreed_rent: property.price,
            security_deposit: 0,
            lease_start_date: None,
            lease_duration_months: Some(11),
            notes: None,
            terms: None,
        },
        status: ReceiptStatus::Confirmed,
        confirmed_at: timestamp(),
        cancellation: None,
        completed_at: None,
    }
}

pub(crate) fn confirm_request(property: &Property, tenant: &str) -> ConfirmDeal {
    ConfirmDeal {
        property_id: property.id.clone(),
        tenant_id: UserId(tenant.to_string()),
        agreed_rent: 30_000,
        security_deposit: Some(90_000),
        lease_start_date: chrono::NaiveDate::from_ymd_opt(2026, 4, 1),
        lease_duration_months: Some(11),
        notes: Some("Two car parks included".to_string()),
        terms: None,
    }
}

pub(crate) type TestService = MarketplaceService<InMemoryMarketplaceStore, MemoryNotifications>;

pub(crate) fn build_service() -> (
    TestService,
    Arc<InMemoryMarketplaceStore>,
    Arc<MemoryNotifications>,
) {
    let store = Arc::new(InMemoryMarketplaceStore::new());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = MarketplaceService::new(
        store.clone(),
        notifications.clone(),
        MarketplaceConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(timestamp())));
    (service, store, notifications)
}

/// Lists a property as [`owner`] and walks it to `approved`.
pub(crate) fn approved_listing<S, N>(service: &MarketplaceService<S, N>) -> Property
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service
        .create_property(&owner(), new_property())
        .expect("listing created");
    service
        .change_status(&owner(), &property.id, PropertyStatus::InDiscussion)
        .expect("in discussion");
    service
        .change_status(&owner(), &property.id, PropertyStatus::Approved)
        .expect("approved")
}

#[derive(Default, Clone)]
pub(crate) struct MemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }

    pub(crate) fn kinds(&self) -> Vec<NotificationKind> {
        self.events()
            .into_iter()
            .map(|notification| notification.kind)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(crate) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("socket closed".to_string()))
    }
}

pub(crate) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MarketplaceStore for UnavailableStore {
    fn insert_property(&self, _property: Property) -> Result<Property, RepositoryError> {
        offline()
    }

    fn fetch_property(
        &self,
        _id: &PropertyId,
        _visibility: Visibility,
    ) -> Result<Option<Property>, RepositoryError> {
        offline()
    }

    fn search_properties(
        &self,
        _filter: &PropertyFilter,
    ) -> Result<Vec<Property>, RepositoryError> {
        offline()
    }

    fn fetch_lead(&self, _id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        offline()
    }

    fn find_lead(&self, _key: &LeadKey) -> Result<Option<Lead>, RepositoryError> {
        offline()
    }

    fn search_leads(&self, _filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        offline()
    }

    fn fetch_receipt(&self, _id: &ReceiptId) -> Result<Option<DealReceipt>, RepositoryError> {
        offline()
    }

    fn confirmed_receipt_for(
        &self,
        _property: &PropertyId,
    ) -> Result<Option<DealReceipt>, RepositoryError> {
        offline()
    }

    fn search_receipts(
        &self,
        _filter: &ReceiptFilter,
    ) -> Result<Vec<DealReceipt>, RepositoryError> {
        offline()
    }

    fn next_receipt_sequence(&self, _year: i32) -> Result<u32, RepositoryError> {
        offline()
    }

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        offline()
    }
}

/// In-memory store whose next lead lookup by key misses, as if another request opened the
/// lead between the lookup and the commit.
#[derive(Default)]
pub(crate) struct LaggingLeadLookup {
    pub(crate) inner: InMemoryMarketplaceStore,
    pub(crate) miss_next_lookup: AtomicBool,
}

impl MarketplaceStore for LaggingLeadLookup {
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        self.inner.insert_property(property)
    }

    fn fetch_property(
        &self,
        id: &PropertyId,
        visibility: Visibility,
    ) -> Result<Option<Property>, RepositoryError> {
        self.inner.fetch_property(id, visibility)
    }

    fn search_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<Vec<Property>, RepositoryError> {
        self.inner.search_properties(filter)
    }

    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.fetch_lead(id)
    }

    fn find_lead(&self, key: &LeadKey) -> Result<Option<Lead>, RepositoryError> {
        if self.miss_next_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_lead(key)
    }

    fn search_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        self.inner.search_leads(filter)
    }

    fn fetch_receipt(&self, id: &ReceiptId) -> Result<Option<DealReceipt>, RepositoryError> {
        self.inner.fetch_receipt(id)
    }

    fn confirmed_receipt_for(
        &self,
        property: &PropertyId,
    ) -> Result<Option<DealReceipt>, RepositoryError> {
        self.inner.confirmed_receipt_for(property)
    }

    fn search_receipts(
        &self,
        filter: &ReceiptFilter,
    ) -> Result<Vec<DealReceipt>, RepositoryError> {
        self.inner.search_receipts(filter)
    }

    fn next_receipt_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        self.inner.next_receipt_sequence(year)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        self.inner.commit(batch)
    }
}

pub(crate) fn request(
    method: Method,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, caller.user_id.0.as_str())
            .header(USER_ROLE_HEADER, caller.role.label());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
