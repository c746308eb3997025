use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use party_common::id::{prefix, prefixed_ulid};

/// A party chat message, user-authored or system-generated.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessage {
    pub id: String,
    pub party_id: String,
    /// Absent for system messages.
    pub user_id: Option<String>,
    /// Nickname snapshot so history survives profile changes.
    pub sender_name: String,
    pub is_system: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(party_id: &str, user_id: &str, sender_name: &str, content: &str) -> Self {
        Self {
            id: prefixed_ulid(prefix::MESSAGE),
            party_id: party_id.to_string(),
            user_id: Some(user_id.to_string()),
            sender_name: sender_name.to_string(),
            is_system: false,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}
