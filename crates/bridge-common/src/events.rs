use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ChannelKind, ChannelState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BridgeEvent {
    ChannelStateChanged {
        kind: ChannelKind,
        state: ChannelState,
    },
    AccountChanged {
        address: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Fan-out of lifecycle events to UI bindings and other observers.
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: BridgeEvent) -> usize {
        tracing::trace!(?event, "bridge event");
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(BridgeEvent::ChannelStateChanged {
            kind: ChannelKind::Popup,
            state: ChannelState::Opening,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            BridgeEvent::ChannelStateChanged {
                kind: ChannelKind::Popup,
                state: ChannelState::Opening,
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(BridgeEvent::AccountChanged { address: None });

        assert!(matches!(rx1.recv().await.unwrap(), BridgeEvent::AccountChanged { address: None }));
        assert!(matches!(rx2.recv().await.unwrap(), BridgeEvent::AccountChanged { address: None }));
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus = EventBus::new(16);
        let count = bus.publish(BridgeEvent::AccountChanged { address: None });
        assert_eq!(count, 0);
    }

    #[test]
    fn event_serialization_shape() {
        let event = BridgeEvent::ChannelStateChanged {
            kind: ChannelKind::Frame,
            state: ChannelState::Ready,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ChannelStateChanged");
        assert_eq!(json["data"]["kind"], "frame");
        assert_eq!(json["data"]["state"], "ready");
    }

    #[test]
    fn unknown_event_deserializes() {
        let json = r#"{"type":"SomethingNew","data":null}"#;
        let event: BridgeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, BridgeEvent::Unknown);
    }
}
