mod common;

use axum::http::StatusCode;

use common::{create_party_via_api, test_server, test_user, with_identity, TestUser};

async fn join(server: &axum_test::TestServer, party_id: &str, user: &TestUser) -> serde_json::Value {
    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/join")),
        user,
    )
    .await;
    resp.assert_status_ok();
    resp.json()
}

// ===========================================================================
// POST /api/v1/parties/:party_id/join and /leave
// ===========================================================================

#[tokio::test]
async fn join_leave_rejoin_flow() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;

    let body = join(&server, &party_id, &alice).await;
    assert_eq!(body["status"], "joined");

    // Joining again is a no-op, not an error.
    let body = join(&server, &party_id, &alice).await;
    assert_eq!(body["status"], "already_member");

    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/leave")),
        &alice,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "left");

    let body = join(&server, &party_id, &alice).await;
    assert_eq!(body["status"], "rejoined");
}

#[tokio::test]
async fn join_requires_identity() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;

    let resp = server
        .post(&format!("/api/v1/parties/{party_id}/join"))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_party_denies_join() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 2, "INSTANT").await;

    join(&server, &party_id, &alice).await;

    let body = join(&server, &party_id, &bob).await;
    assert_eq!(body["status"], "denied");

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &bob,
    )
    .await
    .json();
    assert_eq!(detail["party"]["status"], "FULL");
    assert_eq!(detail["party"]["current_member_count"], 2);
}

#[tokio::test]
async fn leaving_nonmember_is_denied_softly() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let stranger = test_user("stranger");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;

    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/leave")),
        &stranger,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "denied");
}

// ===========================================================================
// DELETE /api/v1/parties/:party_id/members/:user_id
// ===========================================================================

#[tokio::test]
async fn kick_blacklists_and_blocks_rejoin() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;
    join(&server, &party_id, &alice).await;

    let resp = with_identity(
        server.delete(&format!("/api/v1/parties/{party_id}/members/{}", alice.id)),
        &host,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");

    // Blacklisted regardless of free capacity.
    let body = join(&server, &party_id, &alice).await;
    assert_eq!(body["status"], "denied");

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &alice,
    )
    .await
    .json();
    assert_eq!(detail["viewer"]["is_blacklisted"], true);
}

#[tokio::test]
async fn only_the_host_kicks() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;
    join(&server, &party_id, &alice).await;
    join(&server, &party_id, &bob).await;

    let resp = with_identity(
        server.delete(&format!("/api/v1/parties/{party_id}/members/{}", bob.id)),
        &alice,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "denied");
}

// ===========================================================================
// POST /api/v1/parties/:party_id/host
// ===========================================================================

#[tokio::test]
async fn host_transfer_updates_detail() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;
    join(&server, &party_id, &alice).await;

    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/host")),
        &host,
    )
    .json(&serde_json::json!({ "user_id": alice.id }))
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &alice,
    )
    .await
    .json();
    assert_eq!(detail["party"]["host_id"], alice.id.as_str());
    assert_eq!(detail["viewer"]["is_host"], true);
}

// ===========================================================================
// Host succession on leave
// ===========================================================================

#[tokio::test]
async fn host_leave_promotes_earliest_member() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let alice = test_user("alice");
    let bob = test_user("bob");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;
    join(&server, &party_id, &alice).await;
    join(&server, &party_id, &bob).await;

    with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/leave")),
        &host,
    )
    .await
    .assert_status_ok();

    let detail: serde_json::Value = with_identity(
        server.get(&format!("/api/v1/parties/{party_id}")),
        &alice,
    )
    .await
    .json();
    assert_eq!(detail["party"]["host_id"], alice.id.as_str());
    assert_eq!(detail["party"]["status"], "OPEN");
}

#[tokio::test]
async fn last_member_leaving_closes_the_party() {
    let (server, _state) = test_server();
    let host = test_user("host");
    let party_id = create_party_via_api(&server, &host, 5, "INSTANT").await;

    let resp = with_identity(
        server.post(&format!("/api/v1/parties/{party_id}/leave")),
        &host,
    )
    .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "closed");

    let list: serde_json::Value = server.get("/api/v1/parties").await.json();
    assert!(list["parties"].as_array().unwrap().is_empty());
}
