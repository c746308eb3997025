//! Broadcast hub fanning committed events out to connected sockets.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connected socket
//! subscribes and filters events locally by channel name, so a slow or
//! disconnected subscriber never blocks the sender or its peers.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use super::events::{PartyEvent, Scope};

/// Capacity of the broadcast channel. Receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// A payload broadcast to all connected sockets.
#[derive(Debug, Clone)]
pub struct BroadcastPayload {
    /// The channel this event belongs to (`"lobby"` or `"party:{id}"`).
    pub channel: String,
    /// The event's `"type"` tag (e.g. `"member_list_update"`).
    pub event_name: String,
    /// The serialized event, forwarded verbatim to subscribers.
    pub data: Value,
}

/// The broadcast hub. Cloneable: constructed once at startup and shared
/// by handle, never through a global.
#[derive(Clone)]
pub struct PartyBroadcast {
    sender: broadcast::Sender<Arc<BroadcastPayload>>,
}

impl PartyBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the hub. Each socket calls this once for its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastPayload>> {
        self.sender.subscribe()
    }

    /// Publish one event to a scope. Fire-and-forget: an error just means
    /// nobody is listening right now.
    pub fn publish(&self, scope: &Scope, event: &PartyEvent) {
        let data = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(?err, event = event.name(), "failed to serialize event");
                return;
            }
        };
        let _ = self.sender.send(Arc::new(BroadcastPayload {
            channel: scope.channel(),
            event_name: event.name().to_string(),
            data,
        }));
    }
}

impl Default for PartyBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let hub = PartyBroadcast::new();
        let mut rx = hub.subscribe();

        hub.publish(&Scope::Party("pty_1".into()), &PartyEvent::CountUpdate { count: 2 });

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.channel, "party:pty_1");
        assert_eq!(payload.event_name, "count_update");
        assert_eq!(payload.data["count"], 2);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let hub = PartyBroadcast::new();
        hub.publish(&Scope::Lobby, &PartyEvent::PartyDeleted { party_id: "pty_x".into() });
    }
}
