use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Capacity bounds enforced at the request boundary.
pub const MIN_CAPACITY: u32 = 2;
pub const MAX_CAPACITY: u32 = 20;

/// Maximum length of the free-text game mode (e.g. "ranked", "aram").
pub const MODE_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    Open,
    Full,
    /// Terminal. A closed party never accepts another membership mutation.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinPolicy {
    /// Auto-admit joiners up to capacity.
    Instant,
    /// The host must approve each joiner.
    Approval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Party {
    pub id: String,
    pub host_id: String,
    /// Host nickname snapshot, refreshed on host succession/transfer.
    pub host_nickname: String,
    pub game: String,
    pub mode: String,
    pub description: String,
    pub mic_required: bool,
    pub max_members: u32,
    pub join_policy: JoinPolicy,
    /// Cached active-member count. Always recomputed with the member set.
    pub current_member_count: u32,
    pub status: PartyStatus,
    pub pinned_message_id: Option<String>,
    pub pinned_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The card shown in the lobby list and pushed over the lobby feed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartySummary {
    pub id: String,
    pub title: String,
    pub game: String,
    pub host: String,
    pub current_count: u32,
    pub max_members: u32,
    pub status: PartyStatus,
}

impl Party {
    pub fn summary(&self) -> PartySummary {
        PartySummary {
            id: self.id.clone(),
            title: self.mode.clone(),
            game: self.game.clone(),
            host: self.host_nickname.clone(),
            current_count: self.current_member_count,
            max_members: self.max_members,
            status: self.status,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == PartyStatus::Closed
    }

    pub fn is_full(&self) -> bool {
        self.current_member_count >= self.max_members
    }
}
