//! Identity-header extraction.
//!
//! Authentication lives in a fronting identity service; by the time a
//! request reaches this API the caller has been resolved to a set of trusted
//! headers. The extractor only reads them, it never validates credentials.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::engine::UserRef;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const NICKNAME_HEADER: &str = "x-nickname";
pub const EMAIL_VERIFIED_HEADER: &str = "x-email-verified";

/// Authenticated caller, as asserted by the identity collaborator.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub nickname: String,
    pub email_verified: bool,
}

impl AuthUser {
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

/// Rejection returned when the identity headers are missing or malformed.
pub struct AuthError {
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": self.message
            }
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError {
                message: "Missing x-user-id header",
            })?
            .to_string();

        let nickname = parts
            .headers
            .get(NICKNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError {
                message: "Missing x-nickname header",
            })?
            .to_string();

        let email_verified = parts
            .headers
            .get(EMAIL_VERIFIED_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(AuthUser {
            id,
            nickname,
            email_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthUser, AuthError> {
        let state = crate::test_state();
        let (mut parts, _) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn reads_identity_headers() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "usr_abc")
            .header(NICKNAME_HEADER, "alice")
            .header(EMAIL_VERIFIED_HEADER, "true")
            .body(())
            .unwrap();

        let user = extract(request).await.unwrap_or_else(|_| panic!("rejected"));
        assert_eq!(user.id, "usr_abc");
        assert_eq!(user.nickname, "alice");
        assert!(user.email_verified);
    }

    #[tokio::test]
    async fn missing_user_id_is_rejected() {
        let request = Request::builder()
            .header(NICKNAME_HEADER, "alice")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }

    #[tokio::test]
    async fn email_verified_defaults_to_false() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "usr_abc")
            .header(NICKNAME_HEADER, "alice")
            .body(())
            .unwrap();
        let user = extract(request).await.unwrap_or_else(|_| panic!("rejected"));
        assert!(!user.email_verified);
    }
}
