//! Event types for the unified event system.
//!
//! - `ClipboardEvent` - a user's clipboard changed; session caches keyed by
//!   that user's credential must invalidate themselves
//! - `JobEvent` - conversion/export job lifecycle
//! - `SystemEvent` - unified enum combining all event types

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Event emitted after a user's persisted clipboard changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardEvent {
    pub username: String,
    /// The new serialized clipboard contents.
    pub clipboard: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ClipboardEvent {
    pub fn changed(username: impl Into<String>, clipboard: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            clipboard: clipboard.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Lifecycle state of a conversion/export job event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobEventType {
    Submitted,
    Completed,
    Failed,
}

impl JobEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventType::Submitted => "submitted",
            JobEventType::Completed => "completed",
            JobEventType::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event representing a conversion or export job state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub event_type: JobEventType,
    /// Generated job identifier.
    pub job_id: String,
    /// Failure message for `Failed` events.
    pub detail: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl JobEvent {
    pub fn new(event_type: JobEventType, job_id: impl Into<String>) -> Self {
        Self {
            event_type,
            job_id: job_id.into(),
            detail: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self::new(JobEventType::Submitted, job_id)
    }

    pub fn completed(job_id: impl Into<String>) -> Self {
        Self::new(JobEventType::Completed, job_id)
    }

    pub fn failed(job_id: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut event = Self::new(JobEventType::Failed, job_id);
        event.detail = Some(detail.into());
        event
    }
}

/// Unified event type combining all module events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SystemEvent {
    Clipboard(ClipboardEvent),
    Job(JobEvent),
}
