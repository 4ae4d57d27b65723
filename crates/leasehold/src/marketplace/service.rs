use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MarketplaceConfig;

use super::clock::{Clock, SystemClock};
use super::domain::{
    Caller, GeoPoint, Lead, LeadId, LeadKey, LeadLabel, LeadStage, Property, PropertyId,
    PropertyRating, PropertyStatus, Role,
};
use super::error::MarketplaceError;
use super::lifecycle;
use super::notifications::{Notification, NotificationKind, NotificationPublisher};
use super::pagination::{Page, PageRequest};
use super::repository::{
    LeadFilter, MarketplaceStore, PropertyFilter, Radius, RepositoryError, Visibility,
    WriteBatch,
};
use super::requests::{LeadQuery, NewProperty, PropertyChanges, PropertySearch};

/// Service composing the store, notification hooks, and lifecycle rules.
///
/// Every mutation is read-validate-commit: entities are loaded, checked, changed in memory,
/// and handed to the store as one [`WriteBatch`]. Notifications go out only after a
/// successful commit and never fail the operation.
pub struct MarketplaceService<S, N> {
    pub(super) store: Arc<S>,
    pub(super) notifier: Arc<N>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: MarketplaceConfig,
}

impl<S, N> MarketplaceService<S, N>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: MarketplaceConfig) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn create_property(
        &self,
        caller: &Caller,
        draft: NewProperty,
    ) -> Result<Property, MarketplaceError> {
        if caller.role == Role::Tenant {
            return Err(MarketplaceError::Forbidden(
                "tenants cannot list properties".to_string(),
            ));
        }
        draft.validate()?;

        let now = self.clock.now();
        let property = Property {
            id: PropertyId::generate(),
            owner: caller.user_id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            address: draft.address,
            location: draft.location,
            price: draft.price,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area_sqft: draft.area_sqft,
            furnishing: draft.furnishing,
            status: PropertyStatus::Available,
            available: true,
            confirmed_tenant: None,
            rented_at: None,
            archived_at: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            hidden: false,
            hidden_at: None,
            hidden_reason: None,
            images: draft.images,
            ratings: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self.store.insert_property(property)?;
        info!(property_id = %stored.id, owner = %stored.owner, "property listed");
        Ok(stored)
    }

    pub fn update_property(
        &self,
        caller: &Caller,
        id: &PropertyId,
        changes: PropertyChanges,
    ) -> Result<Property, MarketplaceError> {
        changes.validate()?;
        let mut property = self.load_property(id, Visibility::LIVE)?;
        ensure_owner(caller, &property, "edit")?;
        if changes.is_empty() {
            return Ok(property);
        }

        let PropertyChanges {
            title,
            description,
            address,
            location,
            price,
            bedrooms,
            bathrooms,
            area_sqft,
            furnishing,
            images,
        } = changes;

        if let Some(title) = title {
            property.title = title.trim().to_string();
        }
        if let Some(description) = description {
            property.description = description;
        }
        if let Some(address) = address {
            property.address = address;
        }
        if let Some(location) = location {
            property.location = location;
        }
        if let Some(price) = price {
            property.price = price;
        }
        if let Some(bedrooms) = bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(area_sqft) = area_sqft {
            property.area_sqft = area_sqft;
        }
        if let Some(furnishing) = furnishing {
            property.furnishing = furnishing;
        }
        if let Some(images) = images {
            property.images = images;
        }
        property.updated_at = self.clock.now();

        self.save_property(property)
    }

    /// Soft-deleted listings are only visible to admins; hidden ones to their owner and admins.
    pub fn get_property(
        &self,
        caller: Option<&Caller>,
        id: &PropertyId,
    ) -> Result<Property, MarketplaceError> {
        if caller.is_some_and(Caller::is_admin) {
            return self.load_property(id, Visibility::ALL);
        }

        let property = self.load_property(id, Visibility::LIVE)?;
        let is_owner = caller.is_some_and(|caller| property.is_owned_by(&caller.user_id));
        if property.hidden && !is_owner {
            return Err(MarketplaceError::not_found("property", id));
        }
        Ok(property)
    }

    pub fn search_properties(
        &self,
        caller: Option<&Caller>,
        search: PropertySearch,
    ) -> Result<Page<Property>, MarketplaceError> {
        let near = match (search.lat, search.lng, search.radius_km) {
            (None, None, None) => None,
            (Some(lat), Some(lng), Some(km)) => {
                let center = GeoPoint { lat, lng };
                if !center.is_valid() || km <= 0.0 {
                    return Err(MarketplaceError::Validation(
                        "radius search needs a valid point and a positive radius".to_string(),
                    ));
                }
                Some(Radius { center, km })
            }
            _ => {
                return Err(MarketplaceError::Validation(
                    "lat, lng, and radius_km must be supplied together".to_string(),
                ))
            }
        };
        if let (Some(min), Some(max)) = (search.min_price, search.max_price) {
            if min > max {
                return Err(MarketplaceError::Validation(
                    "min_price cannot exceed max_price".to_string(),
                ));
            }
        }

        let visibility = match caller {
            Some(caller) if caller.is_admin() => Visibility {
                include_deleted: search.include_deleted,
                include_hidden: search.include_hidden,
            },
            Some(caller) if search.owner.as_ref() == Some(&caller.user_id) => Visibility::LIVE,
            _ => Visibility::PUBLIC,
        };

        let filter = PropertyFilter {
            owner: search.owner,
            city: search.city,
            min_price: search.min_price,
            max_price: search.max_price,
            min_bedrooms: search.min_bedrooms,
            furnishing: search.furnishing,
            status: search.status,
            available_only: search.available_only,
            near,
            visibility,
        };

        let request = PageRequest::resolve(&self.config, search.page, search.limit);
        let matches = self.store.search_properties(&filter)?;
        Ok(Page::slice(matches, request))
    }

    /// Owner-requested status change along the lifecycle table.
    pub fn change_status(
        &self,
        caller: &Caller,
        id: &PropertyId,
        target: PropertyStatus,
    ) -> Result<Property, MarketplaceError> {
        let mut property = self.load_property(id, Visibility::LIVE)?;
        let from = property.status;
        lifecycle::transition(caller, &mut property, target, self.clock.now())?;

        let saved = self.save_property(property)?;
        info!(property_id = %saved.id, %from, to = %target, "property status changed");
        Ok(saved)
    }

    pub fn delete_property(
        &self,
        caller: &Caller,
        id: &PropertyId,
    ) -> Result<Property, MarketplaceError> {
        let mut property = self.load_property(id, Visibility::LIVE)?;
        ensure_owner(caller, &property, "delete")?;
        if property.status == PropertyStatus::Rented {
            return Err(MarketplaceError::InvalidState(format!(
                "property {} is rented; cancel the deal before deleting it",
                property.id
            )));
        }

        let now = self.clock.now();
        property.deleted = true;
        property.deleted_at = Some(now);
        property.deleted_by = Some(caller.user_id.clone());
        property.available = false;
        property.updated_at = now;

        let saved = self.save_property(property)?;
        info!(property_id = %saved.id, "property soft-deleted");
        Ok(saved)
    }

    /// Admin moderation: hide or reveal a listing.
    pub fn set_visibility(
        &self,
        caller: &Caller,
        id: &PropertyId,
        hidden: bool,
        reason: Option<String>,
    ) -> Result<Property, MarketplaceError> {
        if !caller.is_admin() {
            return Err(MarketplaceError::Forbidden(
                "only administrators can moderate listings".to_string(),
            ));
        }
        let mut property = self.load_property(id, Visibility::LIVE)?;

        let now = self.clock.now();
        property.hidden = hidden;
        if hidden {
            property.hidden_at = Some(now);
            property.hidden_reason = reason;
        } else {
            property.hidden_at = None;
            property.hidden_reason = None;
        }
        property.updated_at = now;

        let saved = self.save_property(property)?;
        info!(
            property_id = %saved.id,
            hidden,
            admin = %caller.user_id,
            "listing visibility changed"
        );
        Ok(saved)
    }

    /// The confirmed tenant scores the listing; a repeat rating replaces the earlier one.
    pub fn rate_property(
        &self,
        caller: &Caller,
        id: &PropertyId,
        score: u8,
    ) -> Result<Property, MarketplaceError> {
        if !(1..=5).contains(&score) {
            return Err(MarketplaceError::Validation(
                "score must be between 1 and 5".to_string(),
            ));
        }
        let mut property = self.load_property(id, Visibility::LIVE)?;
        if property.confirmed_tenant.as_ref() != Some(&caller.user_id) {
            return Err(MarketplaceError::Forbidden(
                "only the confirmed tenant can rate this property".to_string(),
            ));
        }

        let now = self.clock.now();
        property.ratings.retain(|rating| rating.tenant != caller.user_id);
        property.ratings.push(PropertyRating {
            tenant: caller.user_id.clone(),
            score,
            rated_at: now,
        });
        property.updated_at = now;

        self.save_property(property)
    }

    /// A tenant reaching out about a listing opens the lead for the triple, or bumps its
    /// contact counters when it already exists.
    pub fn record_contact(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
    ) -> Result<Lead, MarketplaceError> {
        if caller.role != Role::Tenant {
            return Err(MarketplaceError::Forbidden(
                "only tenants can enquire about listings".to_string(),
            ));
        }
        let property = self.load_property(property_id, Visibility::PUBLIC)?;
        if property.is_owned_by(&caller.user_id) {
            return Err(MarketplaceError::Validation(
                "owners cannot enquire about their own listings".to_string(),
            ));
        }

        let now = self.clock.now();
        let key = LeadKey {
            owner: property.owner.clone(),
            tenant: caller.user_id.clone(),
            property: property.id.clone(),
        };
        let (lead, opened) = match self.store.find_lead(&key)? {
            Some(mut lead) => {
                lead.record_contact(now);
                (lead, false)
            }
            None => (Lead::open(key.clone(), now), true),
        };

        let (lead, opened) = match self.store.commit(WriteBatch::new().put_lead(lead.clone())) {
            Ok(()) => (lead, opened),
            // A concurrent first contact opened the lead; count this one against it.
            Err(RepositoryError::Conflict(_)) if opened => {
                let mut existing = self
                    .store
                    .find_lead(&key)?
                    .ok_or_else(|| MarketplaceError::not_found("lead", &lead.id))?;
                existing.record_contact(now);
                self.store
                    .commit(WriteBatch::new().put_lead(existing.clone()))?;
                (existing, false)
            }
            Err(error) => return Err(error.into()),
        };

        if opened {
            info!(
                lead_id = %lead.id,
                property_id = %property.id,
                tenant = %lead.tenant,
                "lead opened"
            );
            let mut details = BTreeMap::new();
            details.insert("lead_id".to_string(), lead.id.0.clone());
            details.insert("tenant_id".to_string(), lead.tenant.0.clone());
            self.notify(Notification {
                recipient: property.owner.clone(),
                kind: NotificationKind::NewEnquiry,
                property_id: property.id.clone(),
                receipt_id: None,
                message: format!("New enquiry for {}", property.title),
                details,
            });
        }
        Ok(lead)
    }

    pub fn get_lead(&self, caller: &Caller, id: &LeadId) -> Result<Lead, MarketplaceError> {
        let lead = self.load_lead(id)?;
        if !caller.is_admin() && lead.owner != caller.user_id {
            return Err(MarketplaceError::Forbidden(format!(
                "lead {id} belongs to another owner"
            )));
        }
        Ok(lead)
    }

    pub fn list_leads(
        &self,
        caller: &Caller,
        query: LeadQuery,
    ) -> Result<Page<Lead>, MarketplaceError> {
        if caller.role == Role::Tenant {
            return Err(MarketplaceError::Forbidden(
                "leads are only available to owners".to_string(),
            ));
        }
        let filter = LeadFilter {
            owner: caller.user_id.clone(),
            label: query.label,
            stage: query.stage,
            property: query.property_id,
        };
        let request = PageRequest::resolve(&self.config, query.page, query.limit);
        Ok(Page::slice(self.store.search_leads(&filter)?, request))
    }

    pub fn set_lead_label(
        &self,
        caller: &Caller,
        id: &LeadId,
        label: LeadLabel,
    ) -> Result<Lead, MarketplaceError> {
        let mut lead = self.owned_lead(caller, id)?;
        lead.set_label(label, self.clock.now());
        self.store.commit(WriteBatch::new().put_lead(lead.clone()))?;
        Ok(lead)
    }

    pub fn set_lead_stage(
        &self,
        caller: &Caller,
        id: &LeadId,
        stage: LeadStage,
        reason: Option<String>,
    ) -> Result<Lead, MarketplaceError> {
        let mut lead = self.owned_lead(caller, id)?;
        lead.set_stage(stage, reason, self.clock.now());
        self.store.commit(WriteBatch::new().put_lead(lead.clone()))?;
        Ok(lead)
    }

    pub fn add_lead_note(
        &self,
        caller: &Caller,
        id: &LeadId,
        body: &str,
    ) -> Result<Lead, MarketplaceError> {
        let mut lead = self.owned_lead(caller, id)?;
        lead.append_note(&caller.user_id, body, self.clock.now())?;
        self.store.commit(WriteBatch::new().put_lead(lead.clone()))?;
        Ok(lead)
    }

    pub(super) fn load_property(
        &self,
        id: &PropertyId,
        visibility: Visibility,
    ) -> Result<Property, MarketplaceError> {
        self.store
            .fetch_property(id, visibility)?
            .ok_or_else(|| MarketplaceError::not_found("property", id))
    }

    /// Commit a single property write and return it at its new version.
    fn save_property(&self, mut property: Property) -> Result<Property, MarketplaceError> {
        self.store
            .commit(WriteBatch::new().put_property(property.clone()))?;
        property.version += 1;
        Ok(property)
    }

    fn load_lead(&self, id: &LeadId) -> Result<Lead, MarketplaceError> {
        self.store
            .fetch_lead(id)?
            .ok_or_else(|| MarketplaceError::not_found("lead", id))
    }

    fn owned_lead(&self, caller: &Caller, id: &LeadId) -> Result<Lead, MarketplaceError> {
        let lead = self.load_lead(id)?;
        if lead.owner != caller.user_id {
            return Err(MarketplaceError::Forbidden(format!(
                "only the owner of lead {id} can change it"
            )));
        }
        Ok(lead)
    }

    /// Best effort: a failed dispatch is logged and otherwise ignored.
    pub(super) fn notify(&self, notification: Notification) {
        let recipient = notification.recipient.clone();
        let kind = notification.kind;
        if let Err(error) = self.notifier.publish(notification) {
            warn!(%recipient, ?kind, %error, "notification dispatch failed");
        }
    }
}

fn ensure_owner(
    caller: &Caller,
    property: &Property,
    action: &str,
) -> Result<(), MarketplaceError> {
    if property.is_owned_by(&caller.user_id) {
        Ok(())
    } else {
        Err(MarketplaceError::Forbidden(format!(
            "only the owner can {action} property {}",
            property.id
        )))
    }
}
