use axum::Router;
use axum_test::{TestRequest, TestServer};

use party_api::config::Config;
use party_api::AppState;

/// A fake caller, as the identity collaborator would present it.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub nickname: String,
    pub email_verified: bool,
}

pub fn test_user(nickname: &str) -> TestUser {
    TestUser {
        id: party_common::prefixed_ulid("usr"),
        nickname: nickname.to_string(),
        email_verified: true,
    }
}

pub fn unverified_user(nickname: &str) -> TestUser {
    TestUser {
        email_verified: false,
        ..test_user(nickname)
    }
}

pub fn test_state() -> AppState {
    AppState::in_memory(Config::default())
}

pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = party_api::routes::router().with_state(state.clone());
    (app, state)
}

pub fn test_server() -> (TestServer, AppState) {
    let (app, state) = test_app();
    (TestServer::new(app).expect("test server"), state)
}

/// Attach the trusted identity headers the upstream gateway would inject.
pub fn with_identity(request: TestRequest, user: &TestUser) -> TestRequest {
    request
        .add_header("x-user-id", user.id.clone())
        .add_header("x-nickname", user.nickname.clone())
        .add_header(
            "x-email-verified",
            if user.email_verified { "true" } else { "false" },
        )
}

/// Create a party through the API and return its ID.
pub async fn create_party_via_api(
    server: &TestServer,
    host: &TestUser,
    max_members: u32,
    join_policy: &str,
) -> String {
    let resp = with_identity(server.post("/api/v1/parties"), host)
        .json(&serde_json::json!({
            "game": "valorant",
            "mode": "ranked",
            "max_members": max_members,
            "join_policy": join_policy,
        }))
        .await;
    resp.assert_status(axum::http::StatusCode::CREATED);
    let party: serde_json::Value = resp.json();
    party["id"].as_str().expect("party id").to_string()
}
