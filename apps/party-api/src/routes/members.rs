//! Membership endpoints: join, leave, kick, host transfer.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::engine::membership::{JoinOutcome, KickOutcome, LeaveOutcome, TransferOutcome};
use crate::error::{ApiError, ApiErrorBody};
use crate::policy;
use crate::routes::ActionResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parties/{party_id}/join", post(join_party))
        .route("/parties/{party_id}/leave", post(leave_party))
        .route("/parties/{party_id}/members/{user_id}", delete(kick_member))
        .route("/parties/{party_id}/host", post(transfer_host))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferHostRequest {
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/join
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/join",
    tag = "Members",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Join outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "E-mail not verified", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn join_party(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    policy::require_verified_email(&user)?;

    let outcome = state.engine.join(&party_id, &user.user_ref()).await?;
    Ok(Json(match outcome {
        JoinOutcome::Joined => ActionResponse::with_status("joined", "You joined the party"),
        JoinOutcome::Rejoined => {
            ActionResponse::with_status("rejoined", "Welcome back to the party")
        }
        JoinOutcome::AlreadyMember => {
            ActionResponse::with_status("already_member", "You are already in this party")
        }
        JoinOutcome::RequestPending => ActionResponse::with_status(
            "request_pending",
            "This party requires approval; your request is pending",
        ),
        JoinOutcome::Blacklisted => ActionResponse::denied("You cannot join this party"),
        JoinOutcome::Full => ActionResponse::denied("This party is full"),
        JoinOutcome::Closed => ActionResponse::denied("This party is closed"),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/leave
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/leave",
    tag = "Members",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Leave outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn leave_party(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state.engine.leave(&party_id, &user.user_ref()).await?;
    Ok(Json(match outcome {
        LeaveOutcome::Left => ActionResponse::with_status("left", "You left the party"),
        LeaveOutcome::HostChanged { new_host_id } => ActionResponse::with_status(
            "left",
            format!("You left the party; {new_host_id} is the new host"),
        ),
        LeaveOutcome::Closed => {
            ActionResponse::with_status("closed", "The party closed because no members remain")
        }
        LeaveOutcome::NotMember => ActionResponse::denied("You are not in this party"),
        LeaveOutcome::AlreadyClosed => ActionResponse::denied("This party is closed"),
    }))
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/parties/:party_id/members/:user_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/parties/{party_id}/members/{user_id}",
    tag = "Members",
    params(
        ("party_id" = String, Path, description = "Party ID"),
        ("user_id" = String, Path, description = "Member to kick"),
    ),
    responses(
        (status = 200, description = "Kick outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn kick_member(
    user: AuthUser,
    State(state): State<AppState>,
    Path((party_id, target_user_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .kick(&party_id, &user.user_ref(), &target_user_id)
        .await?;
    Ok(Json(match outcome {
        KickOutcome::Kicked => ActionResponse::ok("Member removed and blacklisted"),
        KickOutcome::NotHost => ActionResponse::denied("Only the host can kick members"),
        KickOutcome::NotMember => ActionResponse::denied("That user is not in this party"),
        KickOutcome::CannotKickHost => ActionResponse::denied("The host cannot kick themselves"),
        KickOutcome::AlreadyClosed => ActionResponse::denied("This party is closed"),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/host
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/host",
    tag = "Members",
    params(("party_id" = String, Path, description = "Party ID")),
    request_body = TransferHostRequest,
    responses(
        (status = 200, description = "Transfer outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn transfer_host(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
    Json(body): Json<TransferHostRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .transfer_host(&party_id, &user.user_ref(), &body.user_id)
        .await?;
    Ok(Json(match outcome {
        TransferOutcome::Transferred => ActionResponse::ok("Host transferred"),
        TransferOutcome::NotHost => ActionResponse::denied("Only the host can transfer hosting"),
        TransferOutcome::NotMember => {
            ActionResponse::denied("The new host must be an active member")
        }
        TransferOutcome::AlreadyHost => ActionResponse::denied("You are already the host"),
        TransferOutcome::AlreadyClosed => ActionResponse::denied("This party is closed"),
    }))
}
