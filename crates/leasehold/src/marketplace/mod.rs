//! Rental marketplace: listings and their lifecycle, owner-side leads, and deal receipts.
//!
//! [`MarketplaceService`] is the entry point. It is generic over the storage backend
//! ([`MarketplaceStore`]) and the outbound notification hook ([`NotificationPublisher`]) so
//! the HTTP layer, the demo, and tests can all run against [`InMemoryMarketplaceStore`].

pub mod clock;
mod deals;
pub mod domain;
pub mod error;
pub mod extract;
mod leads;
pub mod lifecycle;
pub mod memory;
pub mod notifications;
pub mod pagination;
pub mod receipts;
pub mod repository;
pub mod requests;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Address, Caller, DealReceipt, Furnishing, GeoPoint, Lead, LeadId, LeadLabel, LeadStage,
    LeaseTerms, Property, PropertyId, PropertyStatus, RatingSummary, ReceiptStatus, Role, UserId,
};
pub use error::MarketplaceError;
pub use memory::InMemoryMarketplaceStore;
pub use notifications::{Notification, NotificationError, NotificationKind, NotificationPublisher};
pub use pagination::{Page, PageRequest};
pub use receipts::ReceiptId;
pub use repository::{MarketplaceStore, RepositoryError, Visibility, WriteBatch};
pub use requests::{
    ConfirmDeal, LeadQuery, NewProperty, PropertyChanges, PropertySearch, ReceiptQuery,
};
pub use router::marketplace_router;
pub use service::MarketplaceService;
