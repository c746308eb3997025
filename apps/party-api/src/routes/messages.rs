//! Party chat endpoints. The WebSocket room is the primary chat path;
//! these exist for history fetches and non-socket clients.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::broadcast::events::{PartyEvent, Scope};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::message::ChatMessage;
use crate::policy;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/parties/{party_id}/messages",
        get(list_messages).post(send_message),
    )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties/:party_id/messages
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties/{party_id}/messages",
    tag = "Messages",
    params(("party_id" = String, Path, description = "Party ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = ChatMessage),
        (status = 400, description = "Empty message", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Party members only", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn send_message(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "content".to_string(),
            message: "Message content is required".to_string(),
        }]));
    }

    let party_state = state
        .store
        .snapshot(&party_id)
        .ok_or_else(|| ApiError::not_found("Party not found"))?;
    policy::require_active_member(&party_state, &user.id)?;

    let message = state
        .chat
        .create_message(ChatMessage::user(&party_id, &user.id, &user.nickname, content))
        .await?;

    state.hub.publish(
        &Scope::Party(party_id),
        &PartyEvent::ChatMessage {
            message_id: message.id.clone(),
            sender: message.sender_name.clone(),
            sender_id: user.id,
            message: message.content.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(message)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/parties/:party_id/messages
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/parties/{party_id}/messages",
    tag = "Messages",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Recent messages, oldest first", body = MessagesResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Party members only", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn list_messages(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let party_state = state
        .store
        .snapshot(&party_id)
        .ok_or_else(|| ApiError::not_found("Party not found"))?;
    policy::require_active_member(&party_state, &user.id)?;

    let messages = state
        .chat
        .list_recent(&party_id, state.config.chat_history_limit)
        .await?;
    Ok(Json(MessagesResponse { messages }))
}
