//! Broadcast scopes and tagged event payloads.
//!
//! Every event serializes to a flat JSON object with a `"type"` discriminator;
//! the gateway routes on the channel and forwards the object verbatim, so
//! clients never see anything the broadcaster didn't queue.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::party::PartySummary;

/// A named broadcast audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every client browsing the party list.
    Lobby,
    /// Clients inside one party's room.
    Party(String),
}

impl Scope {
    /// Channel name the gateway matches subscriptions against.
    pub fn channel(&self) -> String {
        match self {
            Scope::Lobby => "lobby".to_string(),
            Scope::Party(id) => format!("party:{id}"),
        }
    }
}

/// A member entry in the `member_list_update` snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberInfo {
    pub id: String,
    pub nickname: String,
    pub is_host: bool,
}

/// A pending join request as shown in the host-facing feed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestInfo {
    pub id: String,
    pub user_id: String,
    pub nickname: String,
    pub requested_at: DateTime<Utc>,
}

/// A waitlist entry with its 1-based FIFO rank.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaitlistInfo {
    pub user_id: String,
    pub nickname: String,
    pub rank: usize,
}

/// Everything the engines can broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartyEvent {
    // Party scope.
    CountUpdate {
        count: u32,
    },
    MemberListUpdate {
        members: Vec<MemberInfo>,
    },
    SystemMessage {
        message: String,
    },
    ChatMessage {
        message_id: String,
        sender: String,
        sender_id: String,
        message: String,
    },
    UserKicked {
        kicked_user_id: String,
        kicked_user_name: String,
    },
    HostChanged {
        host_id: String,
        host_nickname: String,
    },
    PartyKilled {},
    JoinRequestCreated {
        request: RequestInfo,
    },
    JoinRequestUpdate {
        pending: Vec<RequestInfo>,
    },
    JoinRequestResult {
        target_user_id: String,
        status: String,
        message: String,
    },
    WaitlistUpdate {
        count: usize,
        entries: Vec<WaitlistInfo>,
    },
    PartySettingsUpdate {
        mode: String,
        description: String,
        max_members: u32,
        mic_required: bool,
    },
    PinnedUpdate {
        message_id: Option<String>,
        content: Option<String>,
        pinned_at: Option<DateTime<Utc>>,
    },

    // Lobby scope.
    PartyUpdate {
        party_data: PartySummary,
        is_new: bool,
    },
    PartyDeleted {
        party_id: String,
    },
}

impl PartyEvent {
    /// The `"type"` tag, also used as the dispatch name in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PartyEvent::CountUpdate { .. } => "count_update",
            PartyEvent::MemberListUpdate { .. } => "member_list_update",
            PartyEvent::SystemMessage { .. } => "system_message",
            PartyEvent::ChatMessage { .. } => "chat_message",
            PartyEvent::UserKicked { .. } => "user_kicked",
            PartyEvent::HostChanged { .. } => "host_changed",
            PartyEvent::PartyKilled {} => "party_killed",
            PartyEvent::JoinRequestCreated { .. } => "join_request_created",
            PartyEvent::JoinRequestUpdate { .. } => "join_request_update",
            PartyEvent::JoinRequestResult { .. } => "join_request_result",
            PartyEvent::WaitlistUpdate { .. } => "waitlist_update",
            PartyEvent::PartySettingsUpdate { .. } => "party_settings_update",
            PartyEvent::PinnedUpdate { .. } => "pinned_update",
            PartyEvent::PartyUpdate { .. } => "party_update",
            PartyEvent::PartyDeleted { .. } => "party_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_channel_names() {
        assert_eq!(Scope::Lobby.channel(), "lobby");
        assert_eq!(Scope::Party("pty_1".into()).channel(), "party:pty_1");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = PartyEvent::CountUpdate { count: 3 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "count_update");
        assert_eq!(value["count"], 3);
        assert_eq!(event.name(), "count_update");
    }

    #[test]
    fn member_list_wire_shape() {
        let event = PartyEvent::MemberListUpdate {
            members: vec![MemberInfo {
                id: "usr_1".into(),
                nickname: "alice".into(),
                is_host: true,
            }],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "member_list_update");
        assert_eq!(value["members"][0]["id"], "usr_1");
        assert_eq!(value["members"][0]["is_host"], true);
    }
}
