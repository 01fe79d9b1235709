//! Session event bus.
//!
//! The client publishes here when a session can no longer be recovered; the
//! UI layer subscribes and routes the user back to login. Consumers must treat
//! repeated events idempotently: several racing requests may each report the
//! same expiry.

use tokio::sync::broadcast;
use tracing::debug;

/// Something the application shell needs to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were cleared and cannot be refreshed.
    Expired { reason: String },
}

/// Broadcast channel for [`SessionEvent`]s. Cheap to clone; clones share the channel.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        SessionEvents { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishes an expiry. Returns how many subscribers received it.
    pub fn publish_expired(&self, reason: &str) -> usize {
        let event = SessionEvent::Expired {
            reason: reason.to_string(),
        };
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Session expired event dropped: no subscribers");
                0
            }
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        SessionEvents::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let events = SessionEvents::new(4);
        let mut first = events.subscribe();
        let mut second = events.clone().subscribe();

        assert_eq!(events.publish_expired("Session expired. Please log in again."), 2);

        let expected = SessionEvent::Expired {
            reason: "Session expired. Please log in again.".to_string(),
        };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let events = SessionEvents::default();
        assert_eq!(events.publish_expired("gone"), 0);
    }
}
