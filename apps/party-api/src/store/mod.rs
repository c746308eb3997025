//! In-memory party store with row-level lock-for-update semantics.
//!
//! Each party owns two locks: an async mutex that serializes mutating
//! transactions on that party (acquisition may await behind the current
//! holder, no timeout), and an `RwLock` over the committed state that read
//! paths touch only briefly. Readers never take the transaction lock, so
//! they may observe a slightly stale snapshot; the broadcast layer
//! reconciles clients right after commit.

pub mod chat;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::broadcast::events::{PartyEvent, Scope};
use crate::broadcast::fanout::PartyBroadcast;
use crate::broadcast::outbox::Outbox;
use crate::models::blacklist::BlacklistEntry;
use crate::models::join_request::JoinRequest;
use crate::models::member::Membership;
use crate::models::party::{Party, PartyStatus};
use crate::models::waitlist::WaitlistEntry;

/// A party together with every row that may only change under its lock.
#[derive(Debug, Clone)]
pub struct PartyState {
    pub party: Party,
    pub members: Vec<Membership>,
    pub blacklist: Vec<BlacklistEntry>,
    pub join_requests: Vec<JoinRequest>,
    pub waitlist: Vec<WaitlistEntry>,
}

impl PartyState {
    pub fn new(party: Party) -> Self {
        Self {
            party,
            members: Vec::new(),
            blacklist: Vec::new(),
            join_requests: Vec::new(),
            waitlist: Vec::new(),
        }
    }

    pub fn member(&self, user_id: &str) -> Option<&Membership> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn member_mut(&mut self, user_id: &str) -> Option<&mut Membership> {
        self.members.iter_mut().find(|m| m.user_id == user_id)
    }

    pub fn is_active_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some_and(|m| m.is_active)
    }

    pub fn is_blacklisted(&self, user_id: &str) -> bool {
        self.blacklist.iter().any(|b| b.user_id == user_id)
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Membership> {
        self.members.iter().filter(|m| m.is_active)
    }

    /// 1-based FIFO rank of a waitlisted user: 1 + entries queued strictly
    /// earlier.
    pub fn waitlist_rank(&self, user_id: &str) -> Option<usize> {
        let entry = self.waitlist.iter().find(|w| w.user_id == user_id)?;
        let earlier = self
            .waitlist
            .iter()
            .filter(|w| w.queued_at < entry.queued_at)
            .count();
        Some(earlier + 1)
    }
}

struct PartyEntry {
    /// Serializes mutating transactions on this party.
    txn_lock: Arc<Mutex<()>>,
    /// Committed state; read paths take only this, briefly.
    committed: RwLock<PartyState>,
}

/// Sharded map of all parties. No global lock: transactions on different
/// parties never contend.
pub struct PartyStore {
    parties: DashMap<String, Arc<PartyEntry>>,
}

impl PartyStore {
    pub fn new() -> Self {
        Self {
            parties: DashMap::new(),
        }
    }

    /// Insert a freshly created party (with its founding membership already
    /// in `state`) as one atomic step.
    pub fn create(&self, state: PartyState) {
        let id = state.party.id.clone();
        let entry = Arc::new(PartyEntry {
            txn_lock: Arc::new(Mutex::new(())),
            committed: RwLock::new(state),
        });
        self.parties.insert(id, entry);
    }

    /// Begin a mutating transaction: acquire the party's exclusive lock and
    /// clone its committed state as the working copy. Returns `None` for an
    /// unknown party.
    pub async fn begin(&self, party_id: &str) -> Option<PartyTxn> {
        let entry = self.parties.get(party_id)?.clone();
        let guard = entry.txn_lock.clone().lock_owned().await;
        let state = entry.committed.read().clone();
        Some(PartyTxn {
            entry,
            _guard: guard,
            state,
            outbox: Outbox::new(),
        })
    }

    /// Committed-state snapshot, without the transaction lock.
    pub fn snapshot(&self, party_id: &str) -> Option<PartyState> {
        let entry = self.parties.get(party_id)?;
        let state = entry.committed.read().clone();
        Some(state)
    }

    /// Open and full parties, newest first. Closed parties stay hidden.
    pub fn list_open(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = self
            .parties
            .iter()
            .map(|entry| entry.committed.read().party.clone())
            .filter(|p| p.status != PartyStatus::Closed)
            .collect();
        parties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        parties
    }

    /// Whether the user already hosts a party that is not closed.
    pub fn host_has_open_party(&self, user_id: &str) -> bool {
        self.parties.iter().any(|entry| {
            let state = entry.committed.read();
            state.party.host_id == user_id && state.party.status != PartyStatus::Closed
        })
    }
}

impl Default for PartyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// An open transaction on one party.
///
/// Holds the exclusive lock, a working copy of the state, and the event
/// outbox. `commit` swaps the working copy in and flushes the outbox;
/// dropping the transaction without committing discards both, so an aborted
/// operation leaves no partial writes and emits nothing.
pub struct PartyTxn {
    entry: Arc<PartyEntry>,
    _guard: OwnedMutexGuard<()>,
    pub state: PartyState,
    outbox: Outbox,
}

impl PartyTxn {
    pub fn queue(&mut self, scope: Scope, event: PartyEvent) {
        self.outbox.queue(scope, event);
    }

    /// Commit the working copy, then flush queued events in order.
    pub fn commit(self, hub: &PartyBroadcast) {
        *self.entry.committed.write() = self.state;
        self.outbox.flush(hub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::party::{JoinPolicy, PartyStatus};

    fn make_party(id: &str, host: &str) -> Party {
        Party {
            id: id.to_string(),
            host_id: host.to_string(),
            host_nickname: host.to_string(),
            game: "valorant".to_string(),
            mode: "ranked".to_string(),
            description: String::new(),
            mic_required: false,
            max_members: 5,
            join_policy: JoinPolicy::Instant,
            current_member_count: 1,
            status: PartyStatus::Open,
            pinned_message_id: None,
            pinned_updated_at: None,
            created_at: Utc::now(),
        }
    }

    fn seed(store: &PartyStore, id: &str, host: &str) {
        let mut state = PartyState::new(make_party(id, host));
        state.members.push(Membership::new(id, host, host));
        store.create(state);
    }

    #[tokio::test]
    async fn begin_unknown_party_returns_none() {
        let store = PartyStore::new();
        assert!(store.begin("pty_missing").await.is_none());
    }

    #[tokio::test]
    async fn commit_swaps_state_and_flushes_outbox() {
        let store = PartyStore::new();
        let hub = PartyBroadcast::new();
        let mut rx = hub.subscribe();
        seed(&store, "pty_1", "usr_host");

        let mut txn = store.begin("pty_1").await.unwrap();
        txn.state.party.mode = "aram".to_string();
        txn.queue(
            Scope::Party("pty_1".into()),
            PartyEvent::SystemMessage { message: "updated".into() },
        );
        txn.commit(&hub);

        assert_eq!(store.snapshot("pty_1").unwrap().party.mode, "aram");
        assert_eq!(rx.recv().await.unwrap().event_name, "system_message");
    }

    #[tokio::test]
    async fn dropped_txn_rolls_back_writes_and_events() {
        let store = PartyStore::new();
        let hub = PartyBroadcast::new();
        let mut rx = hub.subscribe();
        seed(&store, "pty_1", "usr_host");

        {
            let mut txn = store.begin("pty_1").await.unwrap();
            txn.state.party.mode = "aram".to_string();
            txn.queue(
                Scope::Party("pty_1".into()),
                PartyEvent::SystemMessage { message: "never sent".into() },
            );
            // Dropped without commit.
        }

        assert_eq!(store.snapshot("pty_1").unwrap().party.mode, "ranked");
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn txn_serializes_writers_per_party() {
        let store = Arc::new(PartyStore::new());
        seed(&store, "pty_1", "usr_host");
        let hub = PartyBroadcast::new();

        // 20 concurrent increments through the txn path must not lose any.
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let mut txn = store.begin("pty_1").await.unwrap();
                txn.state.party.current_member_count += 1;
                txn.commit(&hub);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store.snapshot("pty_1").unwrap().party.current_member_count,
            21
        );
    }

    #[tokio::test]
    async fn snapshot_does_not_block_on_open_txn() {
        let store = PartyStore::new();
        seed(&store, "pty_1", "usr_host");

        let txn = store.begin("pty_1").await.unwrap();
        // Reader sees the committed state while the txn is open.
        assert_eq!(store.snapshot("pty_1").unwrap().party.mode, "ranked");
        drop(txn);
    }

    #[test]
    fn list_open_hides_closed_and_sorts_newest_first() {
        let store = PartyStore::new();

        let mut older = make_party("pty_old", "usr_a");
        older.created_at = Utc::now() - chrono::Duration::seconds(5);
        store.create(PartyState::new(older));
        store.create(PartyState::new(make_party("pty_new", "usr_b")));

        let mut closed = PartyState::new(make_party("pty_closed", "usr_c"));
        closed.party.status = PartyStatus::Closed;
        store.create(closed);

        let listed = store.list_open();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "pty_new");
        assert_eq!(listed[1].id, "pty_old");
    }

    #[test]
    fn waitlist_rank_is_fifo() {
        let mut state = PartyState::new(make_party("pty_1", "usr_host"));
        let mut w1 = WaitlistEntry::new("pty_1", "usr_a", "a");
        let mut w2 = WaitlistEntry::new("pty_1", "usr_b", "b");
        w1.queued_at = Utc::now() - chrono::Duration::seconds(10);
        w2.queued_at = Utc::now();
        // Insert out of order; rank follows queued_at, not insertion.
        state.waitlist.push(w2);
        state.waitlist.push(w1);

        assert_eq!(state.waitlist_rank("usr_a"), Some(1));
        assert_eq!(state.waitlist_rank("usr_b"), Some(2));
        assert_eq!(state.waitlist_rank("usr_c"), None);
    }
}
