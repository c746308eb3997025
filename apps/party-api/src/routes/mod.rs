pub mod health;
pub mod members;
pub mod messages;
pub mod parties;
pub mod pins;
pub mod requests;

use axum::Router;
use serde::Serialize;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::router())
        .nest(
            "/api/v1",
            parties::router()
                .merge(members::router())
                .merge(requests::router())
                .merge(messages::router())
                .merge(pins::router()),
        )
}

/// Uniform 200 envelope for action endpoints. `status` is machine-readable;
/// soft denials use `"denied"` so racing clients get a reason, not a 403.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ActionResponse {
    pub status: String,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_status("ok", message)
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::with_status("denied", message)
    }

    pub fn with_status(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for ActionResponse {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Parties
        parties::list_parties,
        parties::create_party,
        parties::get_party,
        parties::update_settings,
        parties::close_party,
        // Members
        members::join_party,
        members::leave_party,
        members::kick_member,
        members::transfer_host,
        // Requests & waitlist
        requests::create_request,
        requests::list_requests,
        requests::approve_request,
        requests::reject_request,
        requests::cancel_request,
        requests::get_waitlist,
        // Messages
        messages::send_message,
        messages::list_messages,
        // Pins
        pins::pin_message,
        pins::unpin_message,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::party::Party,
            crate::models::party::PartySummary,
            crate::models::party::PartyStatus,
            crate::models::party::JoinPolicy,
            crate::models::member::Membership,
            crate::models::join_request::JoinRequest,
            crate::models::join_request::JoinRequestStatus,
            crate::models::waitlist::WaitlistEntry,
            crate::models::message::ChatMessage,
            crate::broadcast::events::MemberInfo,
            crate::broadcast::events::RequestInfo,
            crate::broadcast::events::WaitlistInfo,
            // Route request/response types
            ActionResponse,
            parties::CreatePartyRequest,
            parties::UpdateSettingsRequest,
            parties::ListPartiesResponse,
            parties::PartyDetail,
            parties::ViewerFlags,
            members::TransferHostRequest,
            requests::PendingRequestsResponse,
            requests::WaitlistResponse,
            messages::SendMessageRequest,
            messages::MessagesResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Parties", description = "Party lifecycle"),
        (name = "Members", description = "Membership and host succession"),
        (name = "Requests", description = "Join requests and the waitlist"),
        (name = "Messages", description = "Party chat"),
        (name = "Pins", description = "Pinned notice"),
    ),
)]
pub struct ApiDoc;
