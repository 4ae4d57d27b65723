//! Property lifecycle and deal workflow engine for a rental listing marketplace.
//!
//! The [`marketplace`] module owns the domain: listings, leads, deal receipts, the status
//! state machine, and the service that ties them together behind storage and notification
//! traits. [`config`], [`telemetry`], and [`error`] carry the process-level plumbing shared
//! with the HTTP service.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
