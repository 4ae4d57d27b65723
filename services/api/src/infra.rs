use chrono::NaiveDate;
use leasehold::marketplace::{Notification, NotificationError, NotificationPublisher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Delivery hook for the HTTP service: notifications are emitted as structured log events
/// for a downstream shipper to fan out.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingNotificationPublisher;

impl NotificationPublisher for TracingNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient,
            kind = ?notification.kind,
            property_id = %notification.property_id,
            receipt_id = ?notification.receipt_id,
            message = %notification.message,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Keeps every notification in memory so the demo can print what would have been sent.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingNotificationPublisher {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationPublisher for RecordingNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotificationError::Transport("recorder mutex poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
