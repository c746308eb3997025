//! Join-request and waitlist endpoints.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::broadcast::events::{RequestInfo, WaitlistInfo};
use crate::engine::admission::{DecisionOutcome, RequestOutcome};
use crate::engine::{pending_infos, waitlist_infos};
use crate::error::{ApiError, ApiErrorBody};
use crate::policy;
use crate::routes::ActionResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/parties/{party_id}/requests",
            get(list_requests).post(create_request),
        )
        .route(
            "/parties/{party_id}/requests/{request_id}/approve",
            post(approve_request),
        )
        .route(
            "/parties/{party_id}/requests/{request_id}/reject",
            post(reject_request),
        )
        .route(
            "/parties/{party_id}/requests/{request_id}/cancel",
            post(cancel_request),
        )
        .route("/parties/{party_id}/waitlist", get(get_waitlist))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRequestsResponse {
    pub requests: Vec<RequestInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WaitlistResponse {
    pub count: usize,
    pub entries: Vec<WaitlistInfo>,
}

fn decision_response(outcome: DecisionOutcome) -> ActionResponse {
    match outcome {
        DecisionOutcome::Approved => ActionResponse::with_status("approved", "Request approved"),
        DecisionOutcome::Queued { rank } => ActionResponse::with_status(
            "queued",
            format!("The party is full; the user is #{rank} on the waitlist"),
        ),
        DecisionOutcome::Rejected => ActionResponse::with_status("rejected", "Request rejected"),
        DecisionOutcome::Cancelled => {
            ActionResponse::with_status("cancelled", "Request cancelled")
        }
        DecisionOutcome::NotHost => {
            ActionResponse::denied("Only the host can decide join requests")
        }
        DecisionOutcome::NotOwner => {
            ActionResponse::denied("Only the requester can cancel this request")
        }
        DecisionOutcome::NotPending => ActionResponse::denied("This request was already decided"),
        DecisionOutcome::Blacklisted => {
            ActionResponse::denied("This user cannot be admitted to the party")
        }
        DecisionOutcome::AlreadyClosed => ActionResponse::denied("This party is closed"),
    }
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/requests
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/requests",
    tag = "Requests",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Request outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "E-mail not verified", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn create_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    policy::require_verified_email(&user)?;

    let outcome = state.engine.request_join(&party_id, &user.user_ref()).await?;
    Ok(Json(match outcome {
        RequestOutcome::Pending => {
            ActionResponse::with_status("pending", "Your request is pending host approval")
        }
        RequestOutcome::AlreadyMember => {
            ActionResponse::with_status("already_member", "You are already in this party")
        }
        RequestOutcome::Blacklisted => ActionResponse::denied("You cannot join this party"),
        RequestOutcome::Closed => ActionResponse::denied("This party is closed"),
        RequestOutcome::InstantPolicy => {
            ActionResponse::denied("This party admits instantly; join it directly")
        }
    }))
}

// ---------------------------------------------------------------------------
// GET /api/v1/parties/:party_id/requests
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/parties/{party_id}/requests",
    tag = "Requests",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Pending requests, oldest first", body = PendingRequestsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Host only", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn list_requests(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<PendingRequestsResponse>, ApiError> {
    let party_state = state
        .store
        .snapshot(&party_id)
        .ok_or_else(|| ApiError::not_found("Party not found"))?;
    if party_state.party.host_id != user.id {
        return Err(ApiError::forbidden("Only the host can view join requests"));
    }

    Ok(Json(PendingRequestsResponse {
        requests: pending_infos(&party_state),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/requests/:request_id/approve
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/requests/{request_id}/approve",
    tag = "Requests",
    params(
        ("party_id" = String, Path, description = "Party ID"),
        ("request_id" = String, Path, description = "Join request ID"),
    ),
    responses(
        (status = 200, description = "Decision outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party or request not found", body = ApiErrorBody),
    ),
)]
pub async fn approve_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path((party_id, request_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .approve(&party_id, &user.user_ref(), &request_id)
        .await?;
    Ok(Json(decision_response(outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/requests/:request_id/reject
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/requests/{request_id}/reject",
    tag = "Requests",
    params(
        ("party_id" = String, Path, description = "Party ID"),
        ("request_id" = String, Path, description = "Join request ID"),
    ),
    responses(
        (status = 200, description = "Decision outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party or request not found", body = ApiErrorBody),
    ),
)]
pub async fn reject_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path((party_id, request_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .reject(&party_id, &user.user_ref(), &request_id)
        .await?;
    Ok(Json(decision_response(outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/requests/:request_id/cancel
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/requests/{request_id}/cancel",
    tag = "Requests",
    params(
        ("party_id" = String, Path, description = "Party ID"),
        ("request_id" = String, Path, description = "Join request ID"),
    ),
    responses(
        (status = 200, description = "Decision outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party or request not found", body = ApiErrorBody),
    ),
)]
pub async fn cancel_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path((party_id, request_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .cancel(&party_id, &user.user_ref(), &request_id)
        .await?;
    Ok(Json(decision_response(outcome)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/parties/:party_id/waitlist
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/parties/{party_id}/waitlist",
    tag = "Requests",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Waitlist entries with FIFO rank", body = WaitlistResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn get_waitlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<WaitlistResponse>, ApiError> {
    let party_state = state
        .store
        .snapshot(&party_id)
        .ok_or_else(|| ApiError::not_found("Party not found"))?;
    policy::require_not_blacklisted(&party_state, &user.id)?;

    let entries = waitlist_infos(&party_state);
    Ok(Json(WaitlistResponse {
        count: entries.len(),
        entries,
    }))
}
