//! Notification gateway port
//!
//! Delivery (templating, SMTP, messaging) is implemented outside the core.
//! A failed send must never roll back a committed invoice or reservation:
//! callers log the failure and move on, retry is an out-of-band concern.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    InvoicePaid,
    ReservationConfirmed,
    ReservationCancelled,
    ReservationNoShow,
}

pub trait NotificationGateway: Send + Sync {
    /// Returns false on delivery failure; never panics, never blocks the
    /// core transaction
    fn send(&self, kind: NotificationKind, recipient: &str, payload: &Value) -> bool;
}

/// Gateway that only records the send in the log stream
#[derive(Debug, Default)]
pub struct LogOnlyGateway;

impl NotificationGateway for LogOnlyGateway {
    fn send(&self, kind: NotificationKind, recipient: &str, payload: &Value) -> bool {
        tracing::info!(?kind, recipient, %payload, "notification dispatched");
        true
    }
}
