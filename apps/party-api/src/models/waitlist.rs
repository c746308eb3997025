use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// A user approved while the party was at capacity, queued for promotion.
/// Ordering is strict FIFO by `queued_at`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaitlistEntry {
    pub party_id: String,
    pub user_id: String,
    pub nickname: String,
    pub queued_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(party_id: &str, user_id: &str, nickname: &str) -> Self {
        Self {
            party_id: party_id.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            queued_at: Utc::now(),
        }
    }
}
