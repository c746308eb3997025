//! Pinned-notice endpoints.

use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::engine::membership::PinOutcome;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::ActionResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parties/{party_id}/pin/{message_id}", put(pin_message))
        .route(
            "/parties/{party_id}/pin",
            axum::routing::delete(unpin_message),
        )
}

fn pin_response(outcome: PinOutcome) -> Result<ActionResponse, ApiError> {
    match outcome {
        PinOutcome::Pinned => Ok(ActionResponse::ok("Message pinned")),
        PinOutcome::Unpinned => Ok(ActionResponse::ok("Pinned message cleared")),
        PinOutcome::NotHost => Ok(ActionResponse::denied("Only the host can manage the pin")),
        PinOutcome::AlreadyClosed => Ok(ActionResponse::denied("This party is closed")),
        PinOutcome::MessageNotFound => Err(ApiError::not_found("Message not found")),
    }
}

// ---------------------------------------------------------------------------
// PUT /api/v1/parties/:party_id/pin/:message_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/api/v1/parties/{party_id}/pin/{message_id}",
    tag = "Pins",
    params(
        ("party_id" = String, Path, description = "Party ID"),
        ("message_id" = String, Path, description = "Message ID"),
    ),
    responses(
        (status = 200, description = "Pin outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party or message not found", body = ApiErrorBody),
    ),
)]
pub async fn pin_message(
    user: AuthUser,
    State(state): State<AppState>,
    Path((party_id, message_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .pin_message(&party_id, &user.user_ref(), &message_id)
        .await?;
    pin_response(outcome).map(Json)
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/parties/:party_id/pin
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/parties/{party_id}/pin",
    tag = "Pins",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Pin outcome", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn unpin_message(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state
        .engine
        .unpin_message(&party_id, &user.user_ref())
        .await?;
    pin_response(outcome).map(Json)
}
