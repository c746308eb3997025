//! Transactional outbox: events queued during a party mutation and flushed
//! only after the mutation commits.
//!
//! The original design fired broadcasts from persistence hooks on every
//! write, which made ordering implicit and leaked events from aborted
//! operations. Here the engines queue into the outbox while holding the
//! party lock, and `PartyTxn::commit` flushes the queue in order once the
//! state swap has happened. A dropped transaction drops its queue with it.

use super::events::{PartyEvent, Scope};
use super::fanout::PartyBroadcast;

#[derive(Default)]
pub struct Outbox {
    queued: Vec<(Scope, PartyEvent)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self { queued: Vec::new() }
    }

    pub fn queue(&mut self, scope: Scope, event: PartyEvent) {
        self.queued.push((scope, event));
    }

    /// Publish every queued event in queue order.
    pub fn flush(self, hub: &PartyBroadcast) {
        for (scope, event) in self.queued {
            tracing::debug!(channel = %scope.channel(), event = event.name(), "flush event");
            hub.publish(&scope, &event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_preserves_queue_order() {
        let hub = PartyBroadcast::new();
        let mut rx = hub.subscribe();

        let mut outbox = Outbox::new();
        let party = Scope::Party("pty_1".into());
        outbox.queue(party.clone(), PartyEvent::CountUpdate { count: 1 });
        outbox.queue(party.clone(), PartyEvent::SystemMessage { message: "a joined".into() });
        outbox.queue(Scope::Lobby, PartyEvent::PartyDeleted { party_id: "pty_1".into() });

        outbox.flush(&hub);

        let names: Vec<String> = vec![
            rx.recv().await.unwrap().event_name.clone(),
            rx.recv().await.unwrap().event_name.clone(),
            rx.recv().await.unwrap().event_name.clone(),
        ];
        assert_eq!(names, ["count_update", "system_message", "party_deleted"]);
    }

    #[test]
    fn dropped_outbox_publishes_nothing() {
        let hub = PartyBroadcast::new();
        let mut rx = hub.subscribe();

        let mut outbox = Outbox::new();
        outbox.queue(Scope::Lobby, PartyEvent::CountUpdate { count: 9 });
        drop(outbox);

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
