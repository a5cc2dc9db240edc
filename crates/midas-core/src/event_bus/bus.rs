//! Broadcast event bus

use crate::event_bus::TurnEvent;
use tokio::sync::broadcast;

/// Lossy broadcast bus for [`TurnEvent`]s.
///
/// Slow subscribers miss events rather than slowing the orchestrator.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TurnEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning the number of subscribers that
    /// received it. Zero subscribers is not an error.
    pub fn publish(&self, event: TurnEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let turn_id = Uuid::new_v4();
        let delivered = bus.publish(TurnEvent::TurnStarted {
            turn_id,
            thread_id: "thread-1".to_string(),
        });
        assert_eq!(delivered, 1);

        match rx.recv().await.unwrap() {
            TurnEvent::TurnStarted { turn_id: id, .. } => assert_eq!(id, turn_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        let delivered = bus.publish(TurnEvent::TurnCompleted {
            turn_id: Uuid::new_v4(),
            thread_id: "thread-1".to_string(),
        });
        assert_eq!(delivered, 0);
    }
}
