//! Admission engine: the join-request state machine and the FIFO waitlist.
//!
//! Request lifecycle: PENDING → {APPROVED, REJECTED, CANCELLED}, terminal on
//! the latter three. A terminal request never blocks a fresh attempt; it is
//! revived back to PENDING instead of duplicated.

use crate::broadcast::events::{PartyEvent, RequestInfo};
use crate::error::ApiError;
use crate::models::join_request::{JoinRequest, JoinRequestStatus};
use crate::models::member::Membership;
use crate::models::party::JoinPolicy;
use crate::models::waitlist::WaitlistEntry;
use crate::store::PartyState;

use super::{queue_effects, recompute, Effects, PartyEngine, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A request is pending (newly filed, revived, or already there).
    Pending,
    AlreadyMember,
    Blacklisted,
    Closed,
    /// The party admits instantly; the caller should just join.
    InstantPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Approved,
    /// Approved while the party was full: the user was queued instead.
    Queued { rank: usize },
    Rejected,
    Cancelled,
    NotHost,
    /// Only the requester may cancel their own request.
    NotOwner,
    /// The request already reached a terminal status.
    NotPending,
    /// The user was blacklisted after requesting; the request is rejected.
    Blacklisted,
    AlreadyClosed,
}

/// Internal result of filing a request inside an open transaction.
pub(crate) enum FileOutcome {
    Filed,
    AlreadyPending,
}

/// Create or revive a PENDING request for `user`. Idempotent: an existing
/// PENDING request stays untouched and queues nothing.
pub(crate) fn file_request(
    state: &mut PartyState,
    user: &UserRef,
    effects: &mut Effects,
) -> FileOutcome {
    let request = match state
        .join_requests
        .iter_mut()
        .find(|r| r.user_id == user.id)
    {
        Some(existing) if existing.status == JoinRequestStatus::Pending => {
            return FileOutcome::AlreadyPending;
        }
        Some(existing) => {
            existing.revive(&user.nickname);
            existing.clone()
        }
        None => {
            let request = JoinRequest::new(&state.party.id, &user.id, &user.nickname);
            state.join_requests.push(request.clone());
            request
        }
    };

    effects.special.push(PartyEvent::JoinRequestCreated {
        request: RequestInfo {
            id: request.id,
            user_id: request.user_id,
            nickname: request.nickname,
            requested_at: request.requested_at,
        },
    });
    effects.requests_changed = true;
    FileOutcome::Filed
}

/// Promote waitlisted users while capacity remains: pop the earliest
/// `queued_at`, skip (and drop) anyone blacklisted or already active without
/// consuming a slot, and grant membership otherwise. Runs to completion,
/// bounded by the waitlist length; always leaves a refreshed waitlist
/// snapshot queued.
pub(crate) fn promote_waitlist(state: &mut PartyState, effects: &mut Effects) {
    loop {
        if state.party.is_closed() || state.party.is_full() {
            break;
        }
        let Some(earliest) = state
            .waitlist
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.queued_at)
            .map(|(i, _)| i)
        else {
            break;
        };
        let entry = state.waitlist.remove(earliest);

        // Skipped entries are deleted without consuming a slot.
        if state.is_blacklisted(&entry.user_id) || state.is_active_member(&entry.user_id) {
            continue;
        }

        grant_membership(state, &entry.user_id, &entry.nickname);
        recompute(state);

        effects.membership_changed = true;
        effects
            .system
            .push(format!("{} was admitted from the waitlist.", entry.nickname));
        effects.special.push(PartyEvent::JoinRequestResult {
            target_user_id: entry.user_id.clone(),
            status: "promoted".to_string(),
            message: "A slot opened up and you have joined the party.".to_string(),
        });
        tracing::info!(
            party_id = %state.party.id,
            user_id = %entry.user_id,
            "promoted from waitlist"
        );
    }
    effects.waitlist_changed = true;
}

/// Reactivate an existing membership row or insert a new one.
fn grant_membership(state: &mut PartyState, user_id: &str, nickname: &str) {
    match state.member_mut(user_id) {
        Some(member) => {
            member.is_active = true;
            member.nickname = nickname.to_string();
        }
        None => {
            let party_id = state.party.id.clone();
            state
                .members
                .push(Membership::new(&party_id, user_id, nickname));
        }
    }
}

impl PartyEngine {
    /// File a join request for an APPROVAL-policy party.
    pub async fn request_join(
        &self,
        party_id: &str,
        user: &UserRef,
    ) -> Result<RequestOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(RequestOutcome::Closed);
        }
        if txn.state.is_blacklisted(&user.id) {
            return Ok(RequestOutcome::Blacklisted);
        }
        if txn.state.is_active_member(&user.id) {
            return Ok(RequestOutcome::AlreadyMember);
        }
        if txn.state.party.join_policy == JoinPolicy::Instant {
            return Ok(RequestOutcome::InstantPolicy);
        }

        let mut effects = Effects::default();
        match file_request(&mut txn.state, user, &mut effects) {
            FileOutcome::Filed => {
                queue_effects(&mut txn, effects);
                txn.commit(&self.hub);
                tracing::info!(party_id, user_id = %user.id, "join request filed");
            }
            FileOutcome::AlreadyPending => {}
        }
        Ok(RequestOutcome::Pending)
    }

    /// Approve a pending request. With capacity available the user becomes
    /// an active member; at capacity the request is still marked APPROVED
    /// but the user lands on the waitlist ("approved but queued").
    pub async fn approve(
        &self,
        party_id: &str,
        actor: &UserRef,
        request_id: &str,
    ) -> Result<DecisionOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(DecisionOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(DecisionOutcome::NotHost);
        }
        let Some(request) = txn
            .state
            .join_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
        else {
            return Err(ApiError::not_found("Join request not found"));
        };
        if request.status != JoinRequestStatus::Pending {
            return Ok(DecisionOutcome::NotPending);
        }

        let mut effects = Effects {
            requests_changed: true,
            ..Default::default()
        };

        // Blacklisted since requesting: refuse and terminate the request.
        if txn.state.is_blacklisted(&request.user_id) {
            decide(&mut txn.state, request_id, JoinRequestStatus::Rejected, &actor.id);
            effects.special.push(PartyEvent::JoinRequestResult {
                target_user_id: request.user_id.clone(),
                status: "rejected".to_string(),
                message: "This user cannot be admitted to the party.".to_string(),
            });
            queue_effects(&mut txn, effects);
            txn.commit(&self.hub);
            return Ok(DecisionOutcome::Blacklisted);
        }

        decide(&mut txn.state, request_id, JoinRequestStatus::Approved, &actor.id);

        // Raced in some other way (e.g. already promoted): nothing to grant.
        if txn.state.is_active_member(&request.user_id) {
            effects.special.push(PartyEvent::JoinRequestResult {
                target_user_id: request.user_id.clone(),
                status: "approved".to_string(),
                message: "You are already a member of this party.".to_string(),
            });
            queue_effects(&mut txn, effects);
            txn.commit(&self.hub);
            return Ok(DecisionOutcome::Approved);
        }

        if !txn.state.party.is_full() {
            grant_membership(&mut txn.state, &request.user_id, &request.nickname);
            let had_waitlist_entry = txn
                .state
                .waitlist
                .iter()
                .any(|w| w.user_id == request.user_id);
            txn.state.waitlist.retain(|w| w.user_id != request.user_id);
            recompute(&mut txn.state);

            effects.membership_changed = true;
            effects
                .system
                .push(format!("{} joined the party.", request.nickname));
            effects.special.push(PartyEvent::JoinRequestResult {
                target_user_id: request.user_id.clone(),
                status: "approved".to_string(),
                message: "Your request was approved.".to_string(),
            });
            effects.waitlist_changed = had_waitlist_entry;
            effects.lobby = Some(PartyEvent::PartyUpdate {
                party_data: txn.state.party.summary(),
                is_new: false,
            });

            queue_effects(&mut txn, effects);
            txn.commit(&self.hub);
            tracing::info!(party_id, user_id = %request.user_id, "join request approved");
            return Ok(DecisionOutcome::Approved);
        }

        // Capacity exhausted at approval time: approved but queued.
        if !txn
            .state
            .waitlist
            .iter()
            .any(|w| w.user_id == request.user_id)
        {
            txn.state
                .waitlist
                .push(WaitlistEntry::new(party_id, &request.user_id, &request.nickname));
        }
        let rank = txn
            .state
            .waitlist_rank(&request.user_id)
            .unwrap_or(txn.state.waitlist.len());

        effects.special.push(PartyEvent::JoinRequestResult {
            target_user_id: request.user_id.clone(),
            status: "queued".to_string(),
            message: format!("The party is full. You are #{rank} on the waitlist."),
        });
        effects.waitlist_changed = true;

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);
        tracing::info!(party_id, user_id = %request.user_id, rank, "approved but queued");
        Ok(DecisionOutcome::Queued { rank })
    }

    /// Reject a pending request. No membership change.
    pub async fn reject(
        &self,
        party_id: &str,
        actor: &UserRef,
        request_id: &str,
    ) -> Result<DecisionOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(DecisionOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(DecisionOutcome::NotHost);
        }
        let Some(request) = txn
            .state
            .join_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
        else {
            return Err(ApiError::not_found("Join request not found"));
        };
        if request.status != JoinRequestStatus::Pending {
            return Ok(DecisionOutcome::NotPending);
        }

        decide(&mut txn.state, request_id, JoinRequestStatus::Rejected, &actor.id);

        let mut effects = Effects {
            requests_changed: true,
            ..Default::default()
        };
        effects.special.push(PartyEvent::JoinRequestResult {
            target_user_id: request.user_id.clone(),
            status: "rejected".to_string(),
            message: "Your request was declined.".to_string(),
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);
        tracing::info!(party_id, user_id = %request.user_id, "join request rejected");
        Ok(DecisionOutcome::Rejected)
    }

    /// Cancel one's own pending request. A first-class transition, not a
    /// connection-level cancellation.
    pub async fn cancel(
        &self,
        party_id: &str,
        user: &UserRef,
        request_id: &str,
    ) -> Result<DecisionOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        let Some(request) = txn
            .state
            .join_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
        else {
            return Err(ApiError::not_found("Join request not found"));
        };
        if request.user_id != user.id {
            return Ok(DecisionOutcome::NotOwner);
        }
        if request.status != JoinRequestStatus::Pending {
            return Ok(DecisionOutcome::NotPending);
        }

        decide(&mut txn.state, request_id, JoinRequestStatus::Cancelled, &user.id);

        let mut effects = Effects {
            requests_changed: true,
            ..Default::default()
        };
        effects.special.push(PartyEvent::JoinRequestResult {
            target_user_id: user.id.clone(),
            status: "cancelled".to_string(),
            message: "Your request was cancelled.".to_string(),
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);
        tracing::info!(party_id, user_id = %user.id, "join request cancelled");
        Ok(DecisionOutcome::Cancelled)
    }
}

fn decide(state: &mut PartyState, request_id: &str, status: JoinRequestStatus, decided_by: &str) {
    if let Some(request) = state.join_requests.iter_mut().find(|r| r.id == request_id) {
        request.decide(status, decided_by);
    }
}
