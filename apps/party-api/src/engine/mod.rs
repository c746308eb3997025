//! Party mutation engines.
//!
//! `membership` owns the member set and derived party state, `admission`
//! owns the join-request and waitlist machines. Every mutating operation
//! runs inside a `PartyTxn`: validate, transition the working copy, queue
//! broadcasts, commit. Denials a concurrent client can legitimately race
//! into (non-host actor, stale request, blacklisted user) come back as
//! typed outcome variants, not errors.

pub mod admission;
pub mod membership;

use std::sync::Arc;

use crate::broadcast::events::{MemberInfo, PartyEvent, RequestInfo, Scope, WaitlistInfo};
use crate::broadcast::fanout::PartyBroadcast;
use crate::store::chat::ChatStore;
use crate::store::{PartyState, PartyStore, PartyTxn};

/// The authenticated actor, as supplied by the identity collaborator.
#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: String,
    pub nickname: String,
}

pub struct PartyEngine {
    pub(crate) store: Arc<PartyStore>,
    pub(crate) chat: Arc<dyn ChatStore>,
    pub(crate) hub: PartyBroadcast,
}

impl PartyEngine {
    pub fn new(store: Arc<PartyStore>, chat: Arc<dyn ChatStore>, hub: PartyBroadcast) -> Self {
        Self { store, chat, hub }
    }
}

/// Everything one mutation wants broadcast, collected while the transition
/// runs and queued in a fixed order at the end so clients never see an
/// inconsistent intermediate view.
#[derive(Default)]
pub(crate) struct Effects {
    /// Queue a fresh count + active-member snapshot.
    pub membership_changed: bool,
    /// Grey system-chat lines, in emission order.
    pub system: Vec<String>,
    /// Specialized party-scope events (kick notices, request results, ...).
    pub special: Vec<PartyEvent>,
    /// Queue a refreshed waitlist snapshot.
    pub waitlist_changed: bool,
    /// Queue a refreshed host-facing pending-request list.
    pub requests_changed: bool,
    /// At most one lobby-feed event per mutation.
    pub lobby: Option<PartyEvent>,
}

/// Recompute the cached count and derived status from the member set.
/// CLOSED is sticky; OPEN/FULL follow count vs capacity.
pub(crate) fn recompute(state: &mut PartyState) {
    use crate::models::party::PartyStatus;

    let count = state.active_members().count() as u32;
    state.party.current_member_count = count;
    if state.party.status != PartyStatus::Closed {
        state.party.status = if count >= state.party.max_members {
            PartyStatus::Full
        } else {
            PartyStatus::Open
        };
    }
}

pub(crate) fn member_infos(state: &PartyState) -> Vec<MemberInfo> {
    state
        .active_members()
        .map(|m| MemberInfo {
            id: m.user_id.clone(),
            nickname: m.nickname.clone(),
            is_host: m.user_id == state.party.host_id,
        })
        .collect()
}

pub(crate) fn pending_infos(state: &PartyState) -> Vec<RequestInfo> {
    use crate::models::join_request::JoinRequestStatus;

    let mut pending: Vec<&crate::models::join_request::JoinRequest> = state
        .join_requests
        .iter()
        .filter(|r| r.status == JoinRequestStatus::Pending)
        .collect();
    pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
    pending
        .into_iter()
        .map(|r| RequestInfo {
            id: r.id.clone(),
            user_id: r.user_id.clone(),
            nickname: r.nickname.clone(),
            requested_at: r.requested_at,
        })
        .collect()
}

pub(crate) fn waitlist_infos(state: &PartyState) -> Vec<WaitlistInfo> {
    let mut entries: Vec<&crate::models::waitlist::WaitlistEntry> =
        state.waitlist.iter().collect();
    entries.sort_by(|a, b| a.queued_at.cmp(&b.queued_at));
    entries
        .iter()
        .enumerate()
        .map(|(i, w)| WaitlistInfo {
            user_id: w.user_id.clone(),
            nickname: w.nickname.clone(),
            rank: i + 1,
        })
        .collect()
}

/// Queue collected effects in the canonical flush order:
/// count → member snapshot → system messages → specialized events →
/// waitlist/pending snapshots → lobby summary.
pub(crate) fn queue_effects(txn: &mut PartyTxn, effects: Effects) {
    let party_scope = Scope::Party(txn.state.party.id.clone());

    if effects.membership_changed {
        txn.queue(
            party_scope.clone(),
            PartyEvent::CountUpdate {
                count: txn.state.party.current_member_count,
            },
        );
        let members = member_infos(&txn.state);
        txn.queue(party_scope.clone(), PartyEvent::MemberListUpdate { members });
    }

    for message in effects.system {
        txn.queue(party_scope.clone(), PartyEvent::SystemMessage { message });
    }

    for event in effects.special {
        txn.queue(party_scope.clone(), event);
    }

    if effects.waitlist_changed {
        let entries = waitlist_infos(&txn.state);
        txn.queue(
            party_scope.clone(),
            PartyEvent::WaitlistUpdate {
                count: entries.len(),
                entries,
            },
        );
    }

    if effects.requests_changed {
        let pending = pending_infos(&txn.state);
        txn.queue(party_scope.clone(), PartyEvent::JoinRequestUpdate { pending });
    }

    if let Some(event) = effects.lobby {
        txn.queue(Scope::Lobby, event);
    }
}
