use tokio::sync::broadcast;
use tracing::debug;

use super::events::HandicapEvent;

const DEFAULT_CAPACITY: usize = 1000;

/// Broadcasts handicap events to every subscriber
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HandicapEvent>,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per slow receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Emits an event to all current subscribers
    pub fn emit(&self, event: HandicapEvent) {
        let event_type = event.event_type();
        let golfer_id = event.golfer_id().to_string();

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    event_type,
                    golfer_id = %golfer_id,
                    receivers = receiver_count,
                    "Event emitted"
                );
            }
            Err(_) => {
                debug!(event_type, golfer_id = %golfer_id, "Event emitted with no receivers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HandicapEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::with_default_capacity();
        let mut receiver = bus.subscribe();

        bus.emit(HandicapEvent::RoundCompleted {
            golfer_id: "pete".into(),
            round_id: "round-1".into(),
            society_id: None,
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "round_completed");
        assert_eq!(event.golfer_id(), "pete");
    }

    #[test]
    fn emitting_without_subscribers_does_not_fail() {
        let bus = EventBus::new(4);
        bus.emit(HandicapEvent::RoundCompleted {
            golfer_id: "pete".into(),
            round_id: "round-1".into(),
            society_id: None,
        });
    }
}
