use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for marketplace accounts (owners, tenants, admins).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for listed properties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

impl PropertyId {
    pub fn generate() -> Self {
        Self(format!("prop-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for CRM leads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn generate() -> Self {
        Self(format!("lead-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account role as asserted by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Tenant,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "tenant" => Some(Self::Tenant),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Tenant => "tenant",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated account issuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
        }
    }

    pub fn owner(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Owner)
    }

    pub fn tenant(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Tenant)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    InDiscussion,
    Approved,
    Rented,
    Archived,
}

impl PropertyStatus {
    pub const ALL: [PropertyStatus; 5] = [
        PropertyStatus::Available,
        PropertyStatus::InDiscussion,
        PropertyStatus::Approved,
        PropertyStatus::Rented,
        PropertyStatus::Archived,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::InDiscussion => "in_discussion",
            PropertyStatus::Approved => "approved",
            PropertyStatus::Rented => "rented",
            PropertyStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Furnishing {
    Unfurnished,
    SemiFurnished,
    FullyFurnished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} {}",
            self.line, self.city, self.state, self.postal_code
        )
    }
}

/// WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A tenant's score for a property they rented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRating {
    pub tenant: UserId,
    pub score: u8,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub count: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub address: Address,
    pub location: GeoPoint,
    pub price: u64,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub area_sqft: u32,
    pub furnishing: Furnishing,
    pub status: PropertyStatus,
    pub available: bool,
    pub confirmed_tenant: Option<UserId>,
    pub rented_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
    pub hidden: bool,
    pub hidden_at: Option<DateTime<Utc>>,
    pub hidden_reason: Option<String>,
    pub images: Vec<String>,
    pub ratings: Vec<PropertyRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every committed write.
    pub version: u64,
}

impl Property {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// `rented` implies a confirmed tenant and no availability.
    #[cfg(test)]
    pub(crate) fn satisfies_rented_invariant(&self) -> bool {
        self.status != PropertyStatus::Rented
            || (self.confirmed_tenant.is_some() && !self.available)
    }

    pub fn rating(&self) -> RatingSummary {
        let count = self.ratings.len() as u32;
        let average = if count == 0 {
            None
        } else {
            let total: u32 = self.ratings.iter().map(|rating| u32::from(rating.score)).sum();
            Some(f64::from(total) / f64::from(count))
        };
        RatingSummary { count, average }
    }

    pub fn snapshot(&self) -> PropertySnapshot {
        PropertySnapshot {
            title: self.title.clone(),
            address: self.address.clone(),
            description: self.description.clone(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area_sqft: self.area_sqft,
            furnishing: self.furnishing,
        }
    }
}

/// Point-in-time copy of the listing fields that a receipt preserves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub title: String,
    pub address: Address,
    pub description: String,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub area_sqft: u32,
    pub furnishing: Furnishing,
}

/// Free-form CRM categorization, independent of the pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadLabel {
    Hot,
    Warm,
    Cold,
    Lost,
    Converted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    Enquiry,
    ViewingScheduled,
    ViewingDone,
    Negotiating,
    Approved,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadNote {
    pub body: String,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

/// Uniqueness key for leads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeadKey {
    pub owner: UserId,
    pub tenant: UserId,
    pub property: PropertyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub owner: UserId,
    pub tenant: UserId,
    pub property: PropertyId,
    pub label: LeadLabel,
    pub stage: LeadStage,
    pub notes: Vec<LeadNote>,
    pub contact_count: u32,
    pub first_contact_at: DateTime<Utc>,
    pub last_contact_at: DateTime<Utc>,
    pub converted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn key(&self) -> LeadKey {
        LeadKey {
            owner: self.owner.clone(),
            tenant: self.tenant.clone(),
            property: self.property.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl ReceiptStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReceiptStatus::Confirmed => "confirmed",
            ReceiptStatus::Cancelled => "cancelled",
            ReceiptStatus::Completed => "completed",
        }
    }
}

/// Commercial terms agreed when a deal is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub agreed_rent: u64,
    pub security_deposit: u64,
    pub lease_start_date: Option<NaiveDate>,
    pub lease_duration_months: Option<u16>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: UserId,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealReceipt {
    pub receipt_id: super::receipts::ReceiptId,
    pub property_id: PropertyId,
    pub owner_id: UserId,
    pub tenant_id: UserId,
    pub snapshot: PropertySnapshot,
    pub lease: LeaseTerms,
    pub status: ReceiptStatus,
    pub confirmed_at: DateTime<Utc>,
    pub cancellation: Option<Cancellation>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DealReceipt {
    /// Owner, tenant, or admin.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        caller.is_admin() || self.is_party(&caller.user_id)
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        &self.owner_id == user || &self.tenant_id == user
    }
}
