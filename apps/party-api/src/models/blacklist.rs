use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// A per-party re-entry ban. Created on kick, never auto-removed: a listed
/// user can neither rejoin nor be promoted into the party.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlacklistEntry {
    pub party_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn new(party_id: &str, user_id: &str) -> Self {
        Self {
            party_id: party_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }
}
