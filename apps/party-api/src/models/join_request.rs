use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use party_common::id::{prefix, prefixed_ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl JoinRequestStatus {
    /// Everything except PENDING is terminal.
    pub fn is_terminal(self) -> bool {
        self != JoinRequestStatus::Pending
    }
}

/// An approval-policy join request. At most one row per (party, user);
/// a new attempt revives the existing row back to PENDING instead of
/// inserting a duplicate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinRequest {
    pub id: String,
    pub party_id: String,
    pub user_id: String,
    pub nickname: String,
    pub status: JoinRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
}

impl JoinRequest {
    pub fn new(party_id: &str, user_id: &str, nickname: &str) -> Self {
        Self {
            id: prefixed_ulid(prefix::REQUEST),
            party_id: party_id.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            status: JoinRequestStatus::Pending,
            requested_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        }
    }

    /// Reset a terminal request back to PENDING for a fresh attempt.
    pub fn revive(&mut self, nickname: &str) {
        self.nickname = nickname.to_string();
        self.status = JoinRequestStatus::Pending;
        self.requested_at = Utc::now();
        self.decided_at = None;
        self.decided_by = None;
    }

    /// Apply a terminal decision.
    pub fn decide(&mut self, status: JoinRequestStatus, decided_by: &str) {
        self.status = status;
        self.decided_at = Some(Utc::now());
        self.decided_by = Some(decided_by.to_string());
    }
}
