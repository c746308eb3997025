use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// A user's current or past participation in a party.
///
/// At most one row exists per (party, user); leaving flips `is_active` off
/// and re-joining flips it back on rather than inserting a duplicate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Membership {
    pub party_id: String,
    pub user_id: String,
    /// Nickname snapshot, refreshed whenever the membership reactivates.
    pub nickname: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(party_id: &str, user_id: &str, nickname: &str) -> Self {
        Self {
            party_id: party_id.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            is_active: true,
            joined_at: Utc::now(),
        }
    }
}
