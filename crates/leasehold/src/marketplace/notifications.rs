use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{PropertyId, UserId};
use super::receipts::ReceiptId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewEnquiry,
    DealConfirmed,
    DealCancelled,
    DealCompleted,
}

/// Outbound message for one recipient. Delivery (socket, e-mail, push) is the publisher's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub property_id: PropertyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<ReceiptId>,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

/// Trait describing outbound notification hooks.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
