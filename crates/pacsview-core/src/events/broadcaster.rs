//! Event broadcaster for the unified event system.
//!
//! The `EventBroadcaster` is the central event bus that all modules use to
//! publish and subscribe to events, built on tokio's broadcast channel.
//! Session management subscribes to clipboard events instead of any module
//! reaching into a process-wide cache.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{ClipboardEvent, JobEvent, SystemEvent};

/// Default buffer size for the broadcast channel. Slow receivers drop the
/// oldest events beyond this limit.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Thread-safe broadcaster, cheap to clone and share across the application.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SystemEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event; 0 when
    /// nobody is listening.
    pub fn send(&self, event: SystemEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Send a clipboard-changed event.
    pub fn send_clipboard_changed(
        &self,
        username: impl Into<String>,
        clipboard: impl Into<String>,
    ) -> usize {
        self.send(SystemEvent::Clipboard(ClipboardEvent::changed(
            username, clipboard,
        )))
    }

    /// Send a job lifecycle event.
    pub fn send_job(&self, event: JobEvent) -> usize {
        self.send(SystemEvent::Job(event))
    }

    /// Subscribe to events broadcast after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        assert!(!broadcaster.has_subscribers());
        let count = broadcaster.send_clipboard_changed("jdoe", "series:5");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_broadcaster_send_receive() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.send_clipboard_changed("jdoe", "series:5,7");

        let event = receiver.recv().await.unwrap();
        match event {
            SystemEvent::Clipboard(ce) => {
                assert_eq!(ce.username, "jdoe");
                assert_eq!(ce.clipboard, "series:5,7");
            }
            other => panic!("expected clipboard event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcaster_multiple_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver1 = broadcaster.subscribe();
        let mut receiver2 = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        let count = broadcaster.send_job(JobEvent::completed("job-1"));
        assert_eq!(count, 2);

        assert!(matches!(
            receiver1.recv().await.unwrap(),
            SystemEvent::Job(_)
        ));
        assert!(matches!(
            receiver2.recv().await.unwrap(),
            SystemEvent::Job(_)
        ));
    }

    #[test]
    fn test_broadcaster_shared() {
        let broadcaster = EventBroadcaster::new_shared();
        let broadcaster2 = broadcaster.clone();
        let _receiver = broadcaster.subscribe();
        assert_eq!(broadcaster2.subscriber_count(), 1);
    }
}
