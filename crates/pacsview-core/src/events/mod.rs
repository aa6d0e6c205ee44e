//! Unified event system for inter-module communication.

mod broadcaster;
mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{ClipboardEvent, JobEvent, JobEventType, SystemEvent};
