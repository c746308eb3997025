//! Party lifecycle endpoints: list, create, detail, settings, close.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::broadcast::events::MemberInfo;
use crate::engine::membership::{
    CloseOutcome, CreateOutcome, NewPartySpec, SettingsChange, SettingsOutcome,
};
use crate::engine::member_infos;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::join_request::JoinRequestStatus;
use crate::models::message::ChatMessage;
use crate::models::party::{
    JoinPolicy, Party, PartySummary, MAX_CAPACITY, MIN_CAPACITY, MODE_MAX_LEN,
};
use crate::policy;
use crate::routes::ActionResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parties", get(list_parties).post(create_party))
        .route(
            "/parties/{party_id}",
            get(get_party).patch(update_settings).delete(close_party),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePartyRequest {
    pub game: String,
    pub mode: String,
    #[serde(default)]
    pub description: String,
    pub max_members: u32,
    pub join_policy: JoinPolicy,
    #[serde(default)]
    pub mic_required: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub mode: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<u32>,
    pub mic_required: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListPartiesResponse {
    pub parties: Vec<PartySummary>,
}

/// What the room view needs in one round trip.
#[derive(Debug, Serialize, ToSchema)]
pub struct PartyDetail {
    pub party: Party,
    pub members: Vec<MemberInfo>,
    pub pinned_message: Option<ChatMessage>,
    pub recent_messages: Vec<ChatMessage>,
    pub viewer: ViewerFlags,
}

/// The viewer's relationship to the party, so the client can pick which
/// controls to render.
#[derive(Debug, Serialize, ToSchema)]
pub struct ViewerFlags {
    pub is_host: bool,
    pub is_member: bool,
    pub is_blacklisted: bool,
    pub has_pending_request: bool,
}

fn validate_mode(mode: &str, errors: &mut Vec<FieldError>) {
    if mode.chars().count() > MODE_MAX_LEN {
        errors.push(FieldError {
            field: "mode".to_string(),
            message: format!("Mode must be at most {MODE_MAX_LEN} characters"),
        });
    }
}

fn validate_capacity(max_members: u32, errors: &mut Vec<FieldError>) {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&max_members) {
        errors.push(FieldError {
            field: "max_members".to_string(),
            message: format!("Capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}"),
        });
    }
}

// ---------------------------------------------------------------------------
// GET /api/v1/parties
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/parties",
    tag = "Parties",
    responses(
        (status = 200, description = "Open and full parties, newest first", body = ListPartiesResponse),
    ),
)]
pub async fn list_parties(State(state): State<AppState>) -> Json<ListPartiesResponse> {
    let parties = state
        .store
        .list_open()
        .iter()
        .map(Party::summary)
        .collect();
    Json(ListPartiesResponse { parties })
}

// ---------------------------------------------------------------------------
// POST /api/v1/parties
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/parties",
    tag = "Parties",
    request_body = CreatePartyRequest,
    responses(
        (status = 201, description = "Party created", body = Party),
        (status = 200, description = "Denied with a reason", body = ActionResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "E-mail not verified", body = ApiErrorBody),
    ),
)]
pub async fn create_party(
    user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePartyRequest>,
) -> Result<Response, ApiError> {
    policy::require_verified_email(&user)?;

    let mut errors = Vec::new();
    if body.game.trim().is_empty() {
        errors.push(FieldError {
            field: "game".to_string(),
            message: "Game is required".to_string(),
        });
    }
    validate_mode(&body.mode, &mut errors);
    validate_capacity(body.max_members, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let spec = NewPartySpec {
        game: body.game.trim().to_string(),
        mode: body.mode,
        description: body.description,
        max_members: body.max_members,
        join_policy: body.join_policy,
        mic_required: body.mic_required,
    };
    match state.engine.create_party(&user.user_ref(), spec).await? {
        CreateOutcome::Created(party) => Ok((StatusCode::CREATED, Json(party)).into_response()),
        CreateOutcome::AlreadyHosting => {
            Ok(ActionResponse::denied("You already host an open party").into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/v1/parties/:party_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/parties/{party_id}",
    tag = "Parties",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Party detail", body = PartyDetail),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn get_party(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<PartyDetail>, ApiError> {
    let party_state = state
        .store
        .snapshot(&party_id)
        .ok_or_else(|| ApiError::not_found("Party not found"))?;

    let recent_messages = state
        .chat
        .list_recent(&party_id, state.config.chat_history_limit)
        .await?;
    let pinned_message = match &party_state.party.pinned_message_id {
        Some(message_id) => state.chat.get_message(&party_id, message_id).await?,
        None => None,
    };

    let viewer = ViewerFlags {
        is_host: party_state.party.host_id == user.id,
        is_member: party_state.is_active_member(&user.id),
        is_blacklisted: party_state.is_blacklisted(&user.id),
        has_pending_request: party_state
            .join_requests
            .iter()
            .any(|r| r.user_id == user.id && r.status == JoinRequestStatus::Pending),
    };

    Ok(Json(PartyDetail {
        members: member_infos(&party_state),
        party: party_state.party,
        pinned_message,
        recent_messages,
        viewer,
    }))
}

// ---------------------------------------------------------------------------
// PATCH /api/v1/parties/:party_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    patch,
    path = "/api/v1/parties/{party_id}",
    tag = "Parties",
    params(("party_id" = String, Path, description = "Party ID")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated, or denied with a reason", body = ActionResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn update_settings(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let mut errors = Vec::new();
    if let Some(mode) = &body.mode {
        validate_mode(mode, &mut errors);
    }
    if let Some(max_members) = body.max_members {
        validate_capacity(max_members, &mut errors);
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let changes = SettingsChange {
        mode: body.mode,
        description: body.description,
        max_members: body.max_members,
        mic_required: body.mic_required,
    };
    let outcome = state
        .engine
        .update_settings(&party_id, &user.user_ref(), changes)
        .await?;
    Ok(Json(match outcome {
        SettingsOutcome::Updated => ActionResponse::ok("Settings updated"),
        SettingsOutcome::NotHost => ActionResponse::denied("Only the host can change settings"),
        SettingsOutcome::CapacityBelowCount => {
            ActionResponse::denied("Capacity cannot drop below the current member count")
        }
        SettingsOutcome::AlreadyClosed => ActionResponse::denied("This party is closed"),
    }))
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/parties/:party_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/parties/{party_id}",
    tag = "Parties",
    params(("party_id" = String, Path, description = "Party ID")),
    responses(
        (status = 200, description = "Party closed, or denied with a reason", body = ActionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Party not found", body = ApiErrorBody),
    ),
)]
pub async fn close_party(
    user: AuthUser,
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state.engine.close(&party_id, &user.user_ref()).await?;
    Ok(Json(match outcome {
        CloseOutcome::Closed => ActionResponse::ok("Party closed"),
        CloseOutcome::NotHost => ActionResponse::denied("Only the host can close the party"),
        CloseOutcome::AlreadyClosed => ActionResponse::denied("This party is already closed"),
    }))
}
