use super::domain::{
    DealReceipt, Furnishing, GeoPoint, Lead, LeadId, LeadKey, LeadLabel, LeadStage, Property,
    PropertyId, PropertyStatus, ReceiptStatus, UserId,
};
use super::receipts::ReceiptId;

/// Which soft-deleted or admin-hidden listings a read may return. Passed explicitly at every
/// call site; the store never filters implicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub include_deleted: bool,
    pub include_hidden: bool,
}

impl Visibility {
    /// Live, unhidden listings only.
    pub const PUBLIC: Visibility = Visibility {
        include_deleted: false,
        include_hidden: false,
    };
    /// Everything that is not soft-deleted.
    pub const LIVE: Visibility = Visibility {
        include_deleted: false,
        include_hidden: true,
    };
    pub const ALL: Visibility = Visibility {
        include_deleted: true,
        include_hidden: true,
    };

    pub fn admits(&self, property: &Property) -> bool {
        (self.include_deleted || !property.deleted) && (self.include_hidden || !property.hidden)
    }
}

/// Radius constraint for location searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius {
    pub center: GeoPoint,
    pub km: f64,
}

/// Listing filter evaluated by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub owner: Option<UserId>,
    pub city: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_bedrooms: Option<u8>,
    pub furnishing: Option<Furnishing>,
    pub status: Option<PropertyStatus>,
    pub available_only: bool,
    pub near: Option<Radius>,
    pub visibility: Visibility,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if !self.visibility.admits(property) {
            return false;
        }
        if let Some(owner) = &self.owner {
            if &property.owner != owner {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !property.address.city.eq_ignore_ascii_case(city.trim()) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| property.price < min)
            || self.max_price.is_some_and(|max| property.price > max)
            || self.min_bedrooms.is_some_and(|min| property.bedrooms < min)
        {
            return false;
        }
        if self.furnishing.is_some_and(|furnishing| property.furnishing != furnishing)
            || self.status.is_some_and(|status| property.status != status)
        {
            return false;
        }
        if self.available_only && !property.available {
            return false;
        }
        match &self.near {
            Some(radius) => property.location.distance_km(&radius.center) <= radius.km,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadFilter {
    pub owner: UserId,
    pub label: Option<LeadLabel>,
    pub stage: Option<LeadStage>,
    pub property: Option<PropertyId>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        lead.owner == self.owner
            && self.label.map_or(true, |label| lead.label == label)
            && self.stage.map_or(true, |stage| lead.stage == stage)
            && self
                .property
                .as_ref()
                .map_or(true, |property| &lead.property == property)
    }
}

/// Receipt filter; `party: None` means every receipt (admin view).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptFilter {
    pub party: Option<UserId>,
    pub status: Option<ReceiptStatus>,
}

impl ReceiptFilter {
    pub fn matches(&self, receipt: &DealReceipt) -> bool {
        self.party
            .as_ref()
            .map_or(true, |party| receipt.is_party(party))
            && self.status.map_or(true, |status| receipt.status == status)
    }
}

/// A set of writes the store applies all-or-nothing.
///
/// Properties must already exist and carry the `version` they were read at; the store bumps
/// the version on apply. Leads and receipts are upserted by id. The store rejects the whole
/// batch when any entry is stale, when a lead would duplicate another lead's
/// (owner, tenant, property) triple, or when a property would end up with more than one
/// confirmed receipt.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    properties: Vec<Property>,
    leads: Vec<Lead>,
    receipts: Vec<DealReceipt>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn put_lead(mut self, lead: Lead) -> Self {
        self.leads.push(lead);
        self
    }

    pub fn put_receipt(mut self, receipt: DealReceipt) -> Self {
        self.receipts.push(receipt);
        self
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn receipts(&self) -> &[DealReceipt] {
        &self.receipts
    }

    pub fn into_parts(self) -> (Vec<Property>, Vec<Lead>, Vec<DealReceipt>) {
        (self.properties, self.leads, self.receipts)
    }
}

/// Storage abstraction so the service can be exercised against any backend.
pub trait MarketplaceStore: Send + Sync {
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch_property(
        &self,
        id: &PropertyId,
        visibility: Visibility,
    ) -> Result<Option<Property>, RepositoryError>;
    fn search_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>, RepositoryError>;

    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    fn find_lead(&self, key: &LeadKey) -> Result<Option<Lead>, RepositoryError>;
    fn search_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError>;

    fn fetch_receipt(&self, id: &ReceiptId) -> Result<Option<DealReceipt>, RepositoryError>;
    fn confirmed_receipt_for(
        &self,
        property: &PropertyId,
    ) -> Result<Option<DealReceipt>, RepositoryError>;
    fn search_receipts(&self, filter: &ReceiptFilter)
        -> Result<Vec<DealReceipt>, RepositoryError>;

    /// Atomically allocate the next receipt sequence for `year`, starting at 1. Allocated
    /// numbers are never handed out twice, even when the batch that used them is rejected.
    fn next_receipt_sequence(&self, year: i32) -> Result<u32, RepositoryError>;

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),
    #[error("{entity} '{id}' changed since it was read")]
    StaleWrite { entity: &'static str, id: String },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
