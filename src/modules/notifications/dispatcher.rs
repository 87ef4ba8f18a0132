use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// State-transition events handed to the host platform for customer and
/// organizer messaging. Email rendering and delivery live on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An installment charge (or retry) succeeded
    InstallmentSuccess,
    /// An installment charge failed; payload carries `first_failure` so the
    /// organizer alert goes out exactly once, on the first failure
    InstallmentFailure,
    /// One installment was cancelled; payload `reason` distinguishes its own
    /// grace expiry from a cascade
    InstallmentCancelled,
    /// The rest of an order's schedule was cancelled after a grace expiry
    ScheduleCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstallmentSuccess => "installment_success",
            Self::InstallmentFailure => "installment_failure",
            Self::InstallmentCancelled => "installment_cancelled",
            Self::ScheduleCancelled => "schedule_cancelled",
        }
    }
}

/// Outbound notification boundary.
///
/// Dispatch is fire-and-forget from the jobs' point of view: a notification
/// problem must never change an entry's payment state, so implementations
/// swallow their own errors.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, order_reference: &str, kind: NotificationKind, payload: Value);
}

/// Default dispatcher that emits structured log events for the host platform
/// to pick up.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify(&self, order_reference: &str, kind: NotificationKind, payload: Value) {
        info!(
            order_reference = order_reference,
            kind = kind.as_str(),
            payload = %payload,
            "Dispatching notification"
        );
    }
}
