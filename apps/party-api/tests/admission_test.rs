mod common;

use axum::http::StatusCode;
use axum_test::TestServer;

use common::{create_party_via_api, test_server, test_user, with_identity, TestUser};

/// File a join request and return its ID from the host's pending list.
async fn request_and_get_id(
    server: &TestServer,
    party_id: &str,
    host: &TestUser,
    requester: &TestUser,
) -> String {
    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/requests")),
        requester,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "pending");

    let pending: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}/requests")),
        host,
    )
    .await
    .json();
    pending["requests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["user_id"] == requester.id.as_str())
        .and_then(|r| r["id"].as_str())
        .expect("request id")
        .to_string()
}

async fn decide(
    server: &TestServer,
    party_id: &str,
    request_id: &str,
    actor: &TestUser,
    verb: &str,
) -> serde_json::Value {
    let resp = with_identity(
        server.post(&format!(
            "/api/v1/parties/{party_id}/requests/{request_id}/{verb}"
        )),
        actor,
    )
    .await;
    resp.assert_status_ok();
    resp.json()
}

// ===========================================================================
// POST /api/v1/parties/:party_id/requests
// ===========================================================================

#[tokio::test]
async fn approval_party_files_requests_not_memberships() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "APPROVAL").await;

    // The generic join endpoint funnels into a pending request.
    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/join")),
        &alice,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "request_pending");

    // Filing again stays idempotent.
    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/requests")),
        &alice,
    )
    .await;
    resp.assert_status_ok();

    let pending: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}/requests")),
        &host,
    )
    .await
    .json();
    assert_eq!(pending["requests"].as_array().unwrap().len(), 1);

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &alice,
    )
    .await
    .json();
    assert_eq!(detail["viewer"]["is_member"], false);
    assert_eq!(detail["viewer"]["has_pending_request"], true);
}

#[tokio::test]
async fn pending_list_is_host_only() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "APPROVAL").await;

    let resp = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}/requests")),
        &alice,
    )
    .await;
    resp.assert_status(StatusCode::FORBIDDEN);
}

// ===========================================================================
// Approve / reject / cancel
// ===========================================================================

#[tokio::test]
async fn approve_grants_membership() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "APPROVAL").await;

    let request_id = request_and_get_id(&server, &party_id, &host, &alice).await;
    let body = decide(&server, &party_id, &request_id, &host, "approve").await;
    assert_eq!(body["status"], "approved");

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &alice,
    )
    .await
    .json();
    assert_eq!(detail["viewer"]["is_member"], true);
    assert_eq!(detail["party"]["current_member_count"], 2);
}

#[tokio::test]
async fn approve_at_capacity_queues_with_rank() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 2, "APPROVAL").await;

    let alice_req = request_and_get_id(&server, &party_id, &host, &alice).await;
    decide(&server, &party_id, &alice_req, &host, "approve").await;

    let bob_req = request_and_get_id(&server, &party_id, &host, &bob).await;
    let body = decide(&server, &party_id, &bob_req, &host, "approve").await;
    assert_eq!(body["status"], "queued");

    let waitlist: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}/waitlist")),
        &bob,
    )
    .await
    .json();
    assert_eq!(waitlist["count"], 1);
    assert_eq!(waitlist["entries"][0]["user_id"], bob.id.as_str());
    assert_eq!(waitlist["entries"][0]["rank"], 1);
}

#[tokio::test]
async fn waitlisted_user_is_promoted_when_a_slot_opens() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 2, "APPROVAL").await;

    let alice_req = request_and_get_id(&server, &party_id, &host, &alice).await;
    decide(&server, &party_id, &alice_req, &host, "approve").await;
    let bob_req = request_and_get_id(&server, &party_id, &host, &bob).await;
    decide(&server, &party_id, &bob_req, &host, "approve").await;

    with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/leave")),
        &alice,
    )
    .await
    .assert_status_ok();

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &bob,
    )
    .await
    .json();
    assert_eq!(detail["viewer"]["is_member"], true);

    let waitlist: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}/waitlist")),
        &bob,
    )
    .await
    .json();
    assert_eq!(waitlist["count"], 0);
}

#[tokio::test]
async fn capacity_raise_promotes_queued_users() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 2, "APPROVAL").await;

    let alice_req = request_and_get_id(&server, &party_id, &host, &alice).await;
    decide(&server, &party_id, &alice_req, &host, "approve").await;
    let bob_req = request_and_get_id(&server, &party_id, &host, &bob).await;
    decide(&server, &party_id, &bob_req, &host, "approve").await;

    with_identity(
        server.patch(&format!("/api/v1/parties/{party_id}")),
        &host,
    )
    .json(&serde_json::json!({ "max_members": 4 }))
    .await
    .assert_status_ok();

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &bob,
    )
    .await
    .json();
    assert_eq!(detail["viewer"]["is_member"], true);
    assert_eq!(detail["party"]["current_member_count"], 3);
}

#[tokio::test]
async fn decided_requests_stay_decided() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "APPROVAL").await;

    let request_id = request_and_get_id(&server, &party_id, &host, &alice).await;
    let body = decide(&server, &party_id, &request_id, &host, "reject").await;
    assert_eq!(body["status"], "rejected");

    // The same request cannot flip to approved afterwards.
    let body = decide(&server, &party_id, &request_id, &host, "approve").await;
    assert_eq!(body["status"], "denied");

    // But the user may file a fresh attempt, which revives the row.
    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/requests")),
        &alice,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn cancel_is_owner_only() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let mallory = test_user("mallory");
    let party_id = create_party_via_api(&server, &host, 5, "APPROVAL").await;

    let request_id = request_and_get_id(&server, &party_id, &host, &alice).await;

    let body = decide(&server, &party_id, &request_id, &mallory, "cancel").await;
    assert_eq!(body["status"], "denied");

    let body = decide(&server, &party_id, &request_id, &alice, "cancel").await;
    assert_eq!(body["status"], "cancelled");
}
