//! Domain event broadcast channel
//!
//! Thin wrapper over `tokio::sync::broadcast`: every subscriber receives
//! every event, in publish order. Publishing with no subscribers is not an
//! error.

use clasp_domain::AuthEvent;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcast channel for [`AuthEvent`]s
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    /// Create a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with an explicit buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AuthEvent) {
        debug!(?event, "publishing auth event");
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the event bus.
    use clasp_domain::{Session, SessionStatus};

    use super::*;

    fn session_removed(id: &str) -> AuthEvent {
        AuthEvent::SessionRemoved(Session { id: id.to_string(), status: SessionStatus::Removed })
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_every_event() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(session_removed("sess_1"));
        bus.publish(session_removed("sess_2"));

        for receiver in [&mut first, &mut second] {
            assert_eq!(receiver.recv().await.unwrap(), session_removed("sess_1"));
            assert_eq!(receiver.recv().await.unwrap(), session_removed("sess_2"));
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        bus.publish(session_removed("sess_1"));
    }
}
