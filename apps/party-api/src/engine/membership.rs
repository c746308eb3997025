//! Membership engine: the single authority over a party's member set and
//! derived fields. Every operation locks the party, transitions the working
//! copy, queues broadcasts, and commits; see `store::PartyTxn`.

use chrono::Utc;

use party_common::id::{prefix, prefixed_ulid};

use crate::broadcast::events::{PartyEvent, Scope};
use crate::error::ApiError;
use crate::models::blacklist::BlacklistEntry;
use crate::models::member::Membership;
use crate::models::party::{JoinPolicy, Party, PartyStatus};
use crate::store::PartyState;

use super::admission::{file_request, promote_waitlist, FileOutcome};
use super::{queue_effects, recompute, Effects, PartyEngine, UserRef};

/// Why a membership is being deactivated. A kick suppresses the generic
/// "left" system message in favor of the dedicated kick notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Voluntary,
    Kicked,
}

/// Validated input for party creation. Range checks on capacity and mode
/// happen at the request boundary; the engine trusts them.
#[derive(Debug, Clone)]
pub struct NewPartySpec {
    pub game: String,
    pub mode: String,
    pub description: String,
    pub max_members: u32,
    pub join_policy: JoinPolicy,
    pub mic_required: bool,
}

/// Host-editable settings; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsChange {
    pub mode: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<u32>,
    pub mic_required: Option<bool>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Party),
    /// The user already hosts a party that is not closed.
    AlreadyHosting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// An inactive membership was reactivated.
    Rejoined,
    /// Idempotent: the caller is already an active member.
    AlreadyMember,
    /// Approval policy: a join request is now pending.
    RequestPending,
    Blacklisted,
    Full,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// The host left and the earliest-joined remaining member took over.
    HostChanged { new_host_id: String },
    /// The host left with no eligible successor; the party closed.
    Closed,
    NotMember,
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickOutcome {
    Kicked,
    NotHost,
    NotMember,
    CannotKickHost,
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    NotHost,
    NotMember,
    AlreadyHost,
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsOutcome {
    Updated,
    NotHost,
    /// Capacity may not drop below the current active-member count.
    CapacityBelowCount,
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NotHost,
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Pinned,
    Unpinned,
    NotHost,
    MessageNotFound,
    AlreadyClosed,
}

impl PartyEngine {
    /// Create a party together with its founding host membership in one
    /// atomic step.
    pub async fn create_party(
        &self,
        host: &UserRef,
        spec: NewPartySpec,
    ) -> Result<CreateOutcome, ApiError> {
        if self.store.host_has_open_party(&host.id) {
            return Ok(CreateOutcome::AlreadyHosting);
        }

        let party = Party {
            id: prefixed_ulid(prefix::PARTY),
            host_id: host.id.clone(),
            host_nickname: host.nickname.clone(),
            game: spec.game,
            mode: spec.mode,
            description: spec.description,
            mic_required: spec.mic_required,
            max_members: spec.max_members,
            join_policy: spec.join_policy,
            current_member_count: 1,
            status: PartyStatus::Open,
            pinned_message_id: None,
            pinned_updated_at: None,
            created_at: Utc::now(),
        };

        let mut state = PartyState::new(party.clone());
        state
            .members
            .push(Membership::new(&party.id, &host.id, &host.nickname));
        self.store.create(state);

        tracing::info!(party_id = %party.id, host_id = %host.id, "party created");
        self.hub.publish(
            &Scope::Lobby,
            &PartyEvent::PartyUpdate {
                party_data: party.summary(),
                is_new: true,
            },
        );

        Ok(CreateOutcome::Created(party))
    }

    /// Join (or rejoin) a party. Under APPROVAL policy this files a join
    /// request with the admission engine instead of granting membership.
    pub async fn join(&self, party_id: &str, user: &UserRef) -> Result<JoinOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(JoinOutcome::Closed);
        }
        if txn.state.is_blacklisted(&user.id) {
            return Ok(JoinOutcome::Blacklisted);
        }
        if txn.state.is_active_member(&user.id) {
            return Ok(JoinOutcome::AlreadyMember);
        }

        if txn.state.party.join_policy == JoinPolicy::Approval {
            let mut effects = Effects::default();
            match file_request(&mut txn.state, user, &mut effects) {
                FileOutcome::Filed => {
                    queue_effects(&mut txn, effects);
                    txn.commit(&self.hub);
                }
                // A PENDING request already exists; nothing to write.
                FileOutcome::AlreadyPending => {}
            }
            return Ok(JoinOutcome::RequestPending);
        }

        if txn.state.party.is_full() {
            return Ok(JoinOutcome::Full);
        }

        let rejoined = match txn.state.member_mut(&user.id) {
            Some(member) => {
                // Reuse the row; original joined_at is preserved.
                member.is_active = true;
                member.nickname = user.nickname.clone();
                true
            }
            None => {
                txn.state
                    .members
                    .push(Membership::new(party_id, &user.id, &user.nickname));
                false
            }
        };

        recompute(&mut txn.state);

        let mut effects = Effects {
            membership_changed: true,
            ..Default::default()
        };
        effects.system.push(if rejoined {
            format!("{} came back to the party.", user.nickname)
        } else {
            format!("{} joined the party.", user.nickname)
        });
        effects.lobby = Some(PartyEvent::PartyUpdate {
            party_data: txn.state.party.summary(),
            is_new: false,
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        tracing::info!(party_id, user_id = %user.id, rejoined, "member joined");
        Ok(if rejoined {
            JoinOutcome::Rejoined
        } else {
            JoinOutcome::Joined
        })
    }

    /// Leave a party. A leaving host triggers host succession; with no
    /// eligible successor the party closes and dependents are purged.
    pub async fn leave(&self, party_id: &str, user: &UserRef) -> Result<LeaveOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(LeaveOutcome::AlreadyClosed);
        }
        let mut effects = Effects {
            membership_changed: true,
            ..Default::default()
        };
        let Some(_leaver_nickname) =
            deactivate_member(&mut txn.state, &user.id, LeaveReason::Voluntary, &mut effects)
        else {
            return Ok(LeaveOutcome::NotMember);
        };
        let was_host = txn.state.party.host_id == user.id;

        let mut outcome = LeaveOutcome::Left;
        if was_host {
            let successor = txn
                .state
                .active_members()
                .min_by_key(|m| m.joined_at)
                .map(|m| (m.user_id.clone(), m.nickname.clone()));

            match successor {
                Some((successor_id, successor_nickname)) => {
                    txn.state.party.host_id = successor_id.clone();
                    txn.state.party.host_nickname = successor_nickname.clone();
                    effects
                        .system
                        .push(format!("{} is now the host.", successor_nickname));
                    effects.special.push(PartyEvent::HostChanged {
                        host_id: successor_id.clone(),
                        host_nickname: successor_nickname,
                    });
                    outcome = LeaveOutcome::HostChanged {
                        new_host_id: successor_id,
                    };
                }
                None => {
                    close_party_state(&mut txn.state);
                    effects.special.push(PartyEvent::PartyKilled {});
                    effects.lobby = Some(PartyEvent::PartyDeleted {
                        party_id: party_id.to_string(),
                    });
                    queue_effects(&mut txn, effects);
                    txn.commit(&self.hub);
                    self.purge_chat(party_id).await;
                    tracing::info!(party_id, "party closed: host left without successor");
                    return Ok(LeaveOutcome::Closed);
                }
            }
        }

        recompute(&mut txn.state);
        promote_waitlist(&mut txn.state, &mut effects);
        effects.lobby = Some(PartyEvent::PartyUpdate {
            party_data: txn.state.party.summary(),
            is_new: false,
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        tracing::info!(party_id, user_id = %user.id, "member left");
        Ok(outcome)
    }

    /// Kick a member: deactivate, blacklist, drop any waitlist entry, then
    /// promote. The generic "left" message is suppressed (LeaveReason::Kicked);
    /// the room gets the dedicated kick notice instead.
    pub async fn kick(
        &self,
        party_id: &str,
        actor: &UserRef,
        target_user_id: &str,
    ) -> Result<KickOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(KickOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(KickOutcome::NotHost);
        }
        if target_user_id == txn.state.party.host_id {
            return Ok(KickOutcome::CannotKickHost);
        }
        let mut effects = Effects {
            membership_changed: true,
            ..Default::default()
        };
        let Some(kicked_nickname) =
            deactivate_member(&mut txn.state, target_user_id, LeaveReason::Kicked, &mut effects)
        else {
            return Ok(KickOutcome::NotMember);
        };

        if !txn.state.is_blacklisted(target_user_id) {
            txn.state
                .blacklist
                .push(BlacklistEntry::new(party_id, target_user_id));
        }
        txn.state.waitlist.retain(|w| w.user_id != target_user_id);

        recompute(&mut txn.state);

        effects.special.push(PartyEvent::UserKicked {
            kicked_user_id: target_user_id.to_string(),
            kicked_user_name: kicked_nickname,
        });
        promote_waitlist(&mut txn.state, &mut effects);
        effects.lobby = Some(PartyEvent::PartyUpdate {
            party_data: txn.state.party.summary(),
            is_new: false,
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        tracing::info!(party_id, target_user_id, actor_id = %actor.id, "member kicked");
        Ok(KickOutcome::Kicked)
    }

    /// Hand host authority to another active member. Count and status are
    /// untouched.
    pub async fn transfer_host(
        &self,
        party_id: &str,
        actor: &UserRef,
        target_user_id: &str,
    ) -> Result<TransferOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(TransferOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(TransferOutcome::NotHost);
        }
        if target_user_id == txn.state.party.host_id {
            return Ok(TransferOutcome::AlreadyHost);
        }
        let Some(target) = txn.state.member(target_user_id) else {
            return Ok(TransferOutcome::NotMember);
        };
        if !target.is_active {
            return Ok(TransferOutcome::NotMember);
        }
        let target_nickname = target.nickname.clone();

        txn.state.party.host_id = target_user_id.to_string();
        txn.state.party.host_nickname = target_nickname.clone();

        let mut effects = Effects {
            // The member snapshot carries is_host flags, so refresh it.
            membership_changed: true,
            ..Default::default()
        };
        effects
            .system
            .push(format!("{} is now the host.", target_nickname));
        effects.special.push(PartyEvent::HostChanged {
            host_id: target_user_id.to_string(),
            host_nickname: target_nickname,
        });
        effects.lobby = Some(PartyEvent::PartyUpdate {
            party_data: txn.state.party.summary(),
            is_new: false,
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        tracing::info!(party_id, new_host = target_user_id, "host transferred");
        Ok(TransferOutcome::Transferred)
    }

    /// Update host-editable settings. A capacity increase frees slots and
    /// triggers waitlist promotion.
    pub async fn update_settings(
        &self,
        party_id: &str,
        actor: &UserRef,
        changes: SettingsChange,
    ) -> Result<SettingsOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(SettingsOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(SettingsOutcome::NotHost);
        }
        if let Some(max) = changes.max_members {
            if max < txn.state.party.current_member_count {
                return Ok(SettingsOutcome::CapacityBelowCount);
            }
        }

        let old_max = txn.state.party.max_members;
        if let Some(mode) = changes.mode {
            txn.state.party.mode = mode;
        }
        if let Some(description) = changes.description {
            txn.state.party.description = description;
        }
        if let Some(max) = changes.max_members {
            txn.state.party.max_members = max;
        }
        if let Some(mic_required) = changes.mic_required {
            txn.state.party.mic_required = mic_required;
        }

        recompute(&mut txn.state);

        let mut effects = Effects::default();
        effects
            .system
            .push("Party settings were updated.".to_string());
        effects.special.push(PartyEvent::PartySettingsUpdate {
            mode: txn.state.party.mode.clone(),
            description: txn.state.party.description.clone(),
            max_members: txn.state.party.max_members,
            mic_required: txn.state.party.mic_required,
        });
        if txn.state.party.max_members > old_max {
            promote_waitlist(&mut txn.state, &mut effects);
        }
        effects.lobby = Some(PartyEvent::PartyUpdate {
            party_data: txn.state.party.summary(),
            is_new: false,
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        tracing::info!(party_id, "settings updated");
        Ok(SettingsOutcome::Updated)
    }

    /// Explicit host-initiated closure. CLOSED is terminal: dependents are
    /// purged and the card disappears from the lobby.
    pub async fn close(&self, party_id: &str, actor: &UserRef) -> Result<CloseOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(CloseOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(CloseOutcome::NotHost);
        }

        close_party_state(&mut txn.state);
        let mut effects = Effects::default();
        effects.special.push(PartyEvent::PartyKilled {});
        effects.lobby = Some(PartyEvent::PartyDeleted {
            party_id: party_id.to_string(),
        });

        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);
        self.purge_chat(party_id).await;

        tracing::info!(party_id, host_id = %actor.id, "party closed by host");
        Ok(CloseOutcome::Closed)
    }

    /// Pin a chat message as the party notice.
    pub async fn pin_message(
        &self,
        party_id: &str,
        actor: &UserRef,
        message_id: &str,
    ) -> Result<PinOutcome, ApiError> {
        let Some(message) = self.chat.get_message(party_id, message_id).await? else {
            return Ok(PinOutcome::MessageNotFound);
        };

        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(PinOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(PinOutcome::NotHost);
        }

        let pinned_at = Utc::now();
        txn.state.party.pinned_message_id = Some(message.id.clone());
        txn.state.party.pinned_updated_at = Some(pinned_at);

        let mut effects = Effects::default();
        effects.special.push(PartyEvent::PinnedUpdate {
            message_id: Some(message.id),
            content: Some(message.content),
            pinned_at: Some(pinned_at),
        });
        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        Ok(PinOutcome::Pinned)
    }

    /// Clear the pinned notice. Idempotent.
    pub async fn unpin_message(
        &self,
        party_id: &str,
        actor: &UserRef,
    ) -> Result<PinOutcome, ApiError> {
        let mut txn = self
            .store
            .begin(party_id)
            .await
            .ok_or_else(|| ApiError::not_found("Party not found"))?;

        if txn.state.party.is_closed() {
            return Ok(PinOutcome::AlreadyClosed);
        }
        if txn.state.party.host_id != actor.id {
            return Ok(PinOutcome::NotHost);
        }

        txn.state.party.pinned_message_id = None;
        txn.state.party.pinned_updated_at = None;

        let mut effects = Effects::default();
        effects.special.push(PartyEvent::PinnedUpdate {
            message_id: None,
            content: None,
            pinned_at: None,
        });
        queue_effects(&mut txn, effects);
        txn.commit(&self.hub);

        Ok(PinOutcome::Unpinned)
    }

    /// Closure cascade: chat history lives with the external collaborator,
    /// so the purge happens after commit and is best effort.
    async fn purge_chat(&self, party_id: &str) {
        if let Err(err) = self.chat.purge_party(party_id).await {
            tracing::warn!(party_id, ?err, "failed to purge chat history");
        }
    }
}

/// Deactivate a membership and emit the matching system message. Returns
/// the nickname snapshot, or `None` when there is no active membership.
///
/// `LeaveReason::Kicked` suppresses the generic "left" line; the caller
/// queues the dedicated kick notice instead.
fn deactivate_member(
    state: &mut PartyState,
    user_id: &str,
    reason: LeaveReason,
    effects: &mut Effects,
) -> Option<String> {
    let member = state.member_mut(user_id)?;
    if !member.is_active {
        return None;
    }
    member.is_active = false;
    let nickname = member.nickname.clone();

    if reason == LeaveReason::Voluntary {
        effects.system.push(format!("{} left the party.", nickname));
    }
    Some(nickname)
}

/// Terminal transition: mark CLOSED and purge every dependent row.
fn close_party_state(state: &mut PartyState) {
    state.party.status = PartyStatus::Closed;
    state.members.clear();
    state.join_requests.clear();
    state.waitlist.clear();
    state.blacklist.clear();
    state.party.current_member_count = 0;
}
