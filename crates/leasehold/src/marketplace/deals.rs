//! Deal confirmation, cancellation, and completion.
//!
//! Confirmation checks its preconditions in a fixed order (ownership, `approved` status,
//! no confirmed tenant, no confirmed receipt) so callers always see the same error for the
//! same state. A listing that is already `rented` reports `Conflict` rather than
//! `InvalidState`, so a repeated confirmation reads as a duplicate.
//!
//! The receipt, the rented listing, and the converted lead are committed as one batch; the
//! store re-checks the single-confirmed-receipt rule inside that commit.

use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::{info, warn};

use super::domain::{
    Cancellation, Caller, DealReceipt, LeadKey, LeadStage, LeaseTerms, PropertyStatus,
    ReceiptStatus, UserId,
};
use super::error::MarketplaceError;
use super::notifications::{Notification, NotificationKind, NotificationPublisher};
use super::pagination::{Page, PageRequest};
use super::receipts::ReceiptId;
use super::repository::{MarketplaceStore, ReceiptFilter, Visibility, WriteBatch};
use super::requests::{ConfirmDeal, ReceiptQuery};
use super::service::MarketplaceService;

impl<S, N> MarketplaceService<S, N>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn confirm_deal(
        &self,
        caller: &Caller,
        request: ConfirmDeal,
    ) -> Result<DealReceipt, MarketplaceError> {
        request.validate()?;
        if request.tenant_id == caller.user_id {
            return Err(MarketplaceError::Validation(
                "an owner cannot confirm a deal with themselves".to_string(),
            ));
        }

        let property = self.load_property(&request.property_id, Visibility::LIVE)?;

        if !property.is_owned_by(&caller.user_id) {
            return Err(MarketplaceError::Forbidden(format!(
                "only the owner can confirm a deal on property {}",
                property.id
            )));
        }
        if property.status == PropertyStatus::Rented {
            return Err(MarketplaceError::Conflict(format!(
                "property {} is already rented",
                property.id
            )));
        }
        if property.status != PropertyStatus::Approved {
            return Err(MarketplaceError::InvalidState(format!(
                "property {} must be approved before confirming a deal (current status: {})",
                property.id, property.status
            )));
        }
        if let Some(tenant) = &property.confirmed_tenant {
            return Err(MarketplaceError::Conflict(format!(
                "property {} is already confirmed for tenant {tenant}",
                property.id
            )));
        }
        if let Some(existing) = self.store.confirmed_receipt_for(&property.id)? {
            return Err(MarketplaceError::Conflict(format!(
                "property {} already has confirmed deal {}",
                property.id, existing.receipt_id
            )));
        }

        let now = self.clock.now();
        let sequence = self.store.next_receipt_sequence(now.year())?;
        let ConfirmDeal {
            tenant_id,
            agreed_rent,
            security_deposit,
            lease_start_date,
            lease_duration_months,
            notes,
            terms,
            ..
        } = request;

        let receipt = DealReceipt {
            receipt_id: ReceiptId::format(now.year(), sequence),
            property_id: property.id.clone(),
            owner_id: property.owner.clone(),
            tenant_id: tenant_id.clone(),
            snapshot: property.snapshot(),
            lease: LeaseTerms {
                agreed_rent,
                security_deposit: security_deposit.unwrap_or(0),
                lease_start_date,
                lease_duration_months,
                notes,
                terms,
            },
            status: ReceiptStatus::Confirmed,
            confirmed_at: now,
            cancellation: None,
            completed_at: None,
        };

        let mut rented = property.clone();
        rented.status = PropertyStatus::Rented;
        rented.confirmed_tenant = Some(tenant_id.clone());
        rented.available = false;
        rented.rented_at = Some(now);
        rented.updated_at = now;

        let lead_key = LeadKey {
            owner: property.owner.clone(),
            tenant: tenant_id.clone(),
            property: property.id.clone(),
        };
        let mut batch = WriteBatch::new()
            .put_receipt(receipt.clone())
            .put_property(rented);
        if let Some(mut lead) = self.store.find_lead(&lead_key)? {
            lead.set_stage(LeadStage::Confirmed, None, now);
            batch = batch.put_lead(lead);
        }

        if let Err(error) = self.store.commit(batch) {
            warn!(
                property_id = %property.id,
                receipt_id = %receipt.receipt_id,
                %error,
                "deal confirmation rejected by store"
            );
            return Err(error.into());
        }

        info!(
            receipt_id = %receipt.receipt_id,
            property_id = %receipt.property_id,
            tenant_id = %receipt.tenant_id,
            agreed_rent = receipt.lease.agreed_rent,
            "deal confirmed"
        );

        for (recipient, message) in [
            (
                receipt.tenant_id.clone(),
                format!("Your rental of {} is confirmed", receipt.snapshot.title),
            ),
            (
                receipt.owner_id.clone(),
                format!("Deal {} confirmed for {}", receipt.receipt_id, receipt.snapshot.title),
            ),
        ] {
            self.notify(deal_notification(
                &receipt,
                recipient,
                NotificationKind::DealConfirmed,
                message,
            ));
        }

        Ok(receipt)
    }

    /// Cancel a confirmed deal and put the listing back on the market. The receipt keeps its
    /// terms and snapshot; only the status and cancellation fields change.
    pub fn cancel_deal(
        &self,
        caller: &Caller,
        receipt_id: &ReceiptId,
        reason: Option<String>,
    ) -> Result<DealReceipt, MarketplaceError> {
        let mut receipt = self.load_receipt(receipt_id)?;
        if !caller.is_admin() && receipt.owner_id != caller.user_id {
            return Err(MarketplaceError::Forbidden(format!(
                "only the owner or an administrator can cancel deal {receipt_id}"
            )));
        }
        match receipt.status {
            ReceiptStatus::Cancelled => {
                return Err(MarketplaceError::AlreadyCancelled(receipt_id.clone()))
            }
            ReceiptStatus::Completed => {
                return Err(MarketplaceError::InvalidState(format!(
                    "deal {receipt_id} is completed and cannot be cancelled"
                )))
            }
            ReceiptStatus::Confirmed => {}
        }

        let now = self.clock.now();
        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        receipt.status = ReceiptStatus::Cancelled;
        receipt.cancellation = Some(Cancellation {
            cancelled_at: now,
            cancelled_by: caller.user_id.clone(),
            reason: reason.clone(),
        });

        let mut batch = WriteBatch::new().put_receipt(receipt.clone());

        let mut property = self.load_property(&receipt.property_id, Visibility::ALL)?;
        if property.confirmed_tenant.as_ref() == Some(&receipt.tenant_id) {
            property.status = PropertyStatus::Available;
            property.confirmed_tenant = None;
            property.rented_at = None;
            property.archived_at = None;
            property.available = true;
            property.updated_at = now;
            batch = batch.put_property(property);
        } else {
            warn!(
                receipt_id = %receipt_id,
                property_id = %property.id,
                "cancelled deal does not match the listing's confirmed tenant; listing left as is"
            );
        }

        let lead_key = LeadKey {
            owner: receipt.owner_id.clone(),
            tenant: receipt.tenant_id.clone(),
            property: receipt.property_id.clone(),
        };
        if let Some(mut lead) = self.store.find_lead(&lead_key)? {
            lead.set_stage(LeadStage::Rejected, reason.clone(), now);
            batch = batch.put_lead(lead);
        }

        self.store.commit(batch)?;
        info!(%receipt_id, cancelled_by = %caller.user_id, "deal cancelled");

        let message = match &reason {
            Some(reason) => format!("Deal {receipt_id} was cancelled: {reason}"),
            None => format!("Deal {receipt_id} was cancelled"),
        };
        self.notify(deal_notification(
            &receipt,
            receipt.tenant_id.clone(),
            NotificationKind::DealCancelled,
            message,
        ));

        Ok(receipt)
    }

    /// Close out a confirmed deal at the end of the lease. The listing stays `rented`.
    pub fn complete_deal(
        &self,
        caller: &Caller,
        receipt_id: &ReceiptId,
    ) -> Result<DealReceipt, MarketplaceError> {
        let mut receipt = self.load_receipt(receipt_id)?;
        if !caller.is_admin() && receipt.owner_id != caller.user_id {
            return Err(MarketplaceError::Forbidden(format!(
                "only the owner or an administrator can complete deal {receipt_id}"
            )));
        }
        match receipt.status {
            ReceiptStatus::Cancelled => {
                return Err(MarketplaceError::AlreadyCancelled(receipt_id.clone()))
            }
            ReceiptStatus::Completed => {
                return Err(MarketplaceError::InvalidState(format!(
                    "deal {receipt_id} is already completed"
                )))
            }
            ReceiptStatus::Confirmed => {}
        }

        let now = self.clock.now();
        receipt.status = ReceiptStatus::Completed;
        receipt.completed_at = Some(now);
        self.store
            .commit(WriteBatch::new().put_receipt(receipt.clone()))?;
        info!(%receipt_id, "deal completed");

        self.notify(deal_notification(
            &receipt,
            receipt.tenant_id.clone(),
            NotificationKind::DealCompleted,
            format!("Deal {receipt_id} is complete"),
        ));
        Ok(receipt)
    }

    pub fn get_receipt(
        &self,
        caller: &Caller,
        receipt_id: &ReceiptId,
    ) -> Result<DealReceipt, MarketplaceError> {
        let receipt = self.load_receipt(receipt_id)?;
        if !receipt.is_visible_to(caller) {
            return Err(MarketplaceError::Forbidden(format!(
                "deal {receipt_id} is not yours to view"
            )));
        }
        Ok(receipt)
    }

    /// Receipts where the caller is owner or tenant, newest first. Admins see every receipt.
    pub fn list_receipts(
        &self,
        caller: &Caller,
        query: ReceiptQuery,
    ) -> Result<Page<DealReceipt>, MarketplaceError> {
        let filter = ReceiptFilter {
            party: (!caller.is_admin()).then(|| caller.user_id.clone()),
            status: query.status,
        };
        let request = PageRequest::resolve(&self.config, query.page, query.limit);
        Ok(Page::slice(self.store.search_receipts(&filter)?, request))
    }

    fn load_receipt(&self, receipt_id: &ReceiptId) -> Result<DealReceipt, MarketplaceError> {
        self.store
            .fetch_receipt(receipt_id)?
            .ok_or_else(|| MarketplaceError::not_found("deal receipt", receipt_id))
    }
}

fn deal_notification(
    receipt: &DealReceipt,
    recipient: UserId,
    kind: NotificationKind,
    message: String,
) -> Notification {
    let mut details = BTreeMap::new();
    details.insert("status".to_string(), receipt.status.label().to_string());
    details.insert(
        "agreed_rent".to_string(),
        receipt.lease.agreed_rent.to_string(),
    );
    Notification {
        recipient,
        kind,
        property_id: receipt.property_id.clone(),
        receipt_id: Some(receipt.receipt_id.clone()),
        message,
        details,
    }
}
