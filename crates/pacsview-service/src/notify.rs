//! Best-effort operator notification for boundary failures.
//!
//! The service never couples domain logic to a delivery mechanism: failures
//! are handed to an [`OperatorNotifier`] behind a trait, and delivery errors
//! are swallowed with a warning. Only a tracing adapter ships here; a mail
//! or chat adapter plugs in at deployment.

use tracing::warn;

use pacsview_core::CoreError;

/// Delivery channel for operator failure notifications.
pub trait OperatorNotifier: Send + Sync {
    /// Deliver one notification. Must not block the caller for long.
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Adapter that emits notifications into the log stream.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl OperatorNotifier for TracingNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        warn!(recipient, subject, body, "operator notification");
        Ok(())
    }
}

/// Log a boundary failure and forward it to the operator when a recipient
/// is configured. Never fails; delivery errors are logged and dropped.
pub fn report_failure(
    notifier: &dyn OperatorNotifier,
    recipient: Option<&str>,
    context: &str,
    error: &CoreError,
) {
    tracing::error!(context, category = %error.category(), error = %error, "request failed");
    if let Some(recipient) = recipient
        && let Err(delivery) = notifier.notify(recipient, context, &error.to_string())
    {
        warn!(recipient, error = %delivery, "operator notification failed");
    }
}
