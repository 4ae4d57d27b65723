use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Address, Furnishing, GeoPoint, LeadLabel, LeadStage, PropertyId, PropertyStatus,
    ReceiptStatus, UserId,
};
use super::error::MarketplaceError;

/// Owner-supplied listing details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub address: Address,
    pub location: GeoPoint,
    pub price: u64,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub area_sqft: u32,
    pub furnishing: Furnishing,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProperty {
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        validate_title(&self.title)?;
        validate_price(self.price)?;
        validate_location(&self.location)?;
        validate_address(&self.address)
    }
}

/// Partial edit of a listing; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    pub price: Option<u64>,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    pub area_sqft: Option<u32>,
    pub furnishing: Option<Furnishing>,
    pub images: Option<Vec<String>>,
}

impl PropertyChanges {
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn validate_title(title: &str) -> Result<(), MarketplaceError> {
    if title.trim().is_empty() {
        return Err(MarketplaceError::Validation("title is required".to_string()));
    }
    Ok(())
}

fn validate_price(price: u64) -> Result<(), MarketplaceError> {
    if price == 0 {
        return Err(MarketplaceError::Validation(
            "price must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_location(location: &GeoPoint) -> Result<(), MarketplaceError> {
    if !location.is_valid() {
        return Err(MarketplaceError::Validation(format!(
            "location ({}, {}) is outside valid latitude/longitude ranges",
            location.lat, location.lng
        )));
    }
    Ok(())
}

fn validate_address(address: &Address) -> Result<(), MarketplaceError> {
    if address.line.trim().is_empty() || address.city.trim().is_empty() {
        return Err(MarketplaceError::Validation(
            "address line and city are required".to_string(),
        ));
    }
    Ok(())
}

/// Listing search parameters as accepted on the query string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropertySearch {
    pub city: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_bedrooms: Option<u8>,
    pub furnishing: Option<Furnishing>,
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub available_only: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub owner: Option<UserId>,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadQuery {
    pub label: Option<LeadLabel>,
    pub stage: Option<LeadStage>,
    pub property_id: Option<PropertyId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReceiptQuery {
    pub status: Option<ReceiptStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Terms the owner submits when confirming a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmDeal {
    pub property_id: PropertyId,
    pub tenant_id: UserId,
    pub agreed_rent: u64,
    #[serde(default)]
    pub security_deposit: Option<u64>,
    #[serde(default)]
    pub lease_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub lease_duration_months: Option<u16>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
}

impl ConfirmDeal {
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if self.property_id.0.trim().is_empty() {
            return Err(MarketplaceError::Validation(
                "property_id is required".to_string(),
            ));
        }
        if self.tenant_id.0.trim().is_empty() {
            return Err(MarketplaceError::Validation("tenant_id is required".to_string()));
        }
        if self.agreed_rent == 0 {
            return Err(MarketplaceError::Validation(
                "agreed_rent must be greater than zero".to_string(),
            ));
        }
        if self.lease_duration_months == Some(0) {
            return Err(MarketplaceError::Validation(
                "lease_duration_months must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
