//! WebSocket upgrade handlers and the per-connection event loop.
//!
//! Two audiences: `/ws/lobby` streams party-card updates to everyone
//! browsing the list, `/ws/parties/{party_id}` streams room events to the
//! people inside one party. Events arrive pre-serialized from the fanout
//! hub; a connection forwards the ones whose channel matches its own and
//! ignores the rest.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::auth::AuthUser;
use crate::broadcast::events::{PartyEvent, Scope};
use crate::models::message::ChatMessage;
use crate::AppState;

/// Application close codes (4000-range).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_FORBIDDEN: u16 = 4003;
const CLOSE_NOT_FOUND: u16 = 4004;

/// Client frame on a party socket.
#[derive(Debug, Deserialize)]
struct ClientFrame {
    message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/lobby", get(lobby_upgrade))
        .route("/ws/parties/{party_id}", get(party_upgrade))
}

/// The lobby feed is read-only and open to unauthenticated browsers.
async fn lobby_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state, Scope::Lobby.channel(), None))
}

async fn party_upgrade(
    ws: WebSocketUpgrade,
    Path(party_id): Path<String>,
    State(state): State<AppState>,
    user: AuthUser,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_party_connection(socket, state, party_id, user))
}

async fn handle_party_connection(
    socket: WebSocket,
    state: AppState,
    party_id: String,
    user: AuthUser,
) {
    let (mut ws_tx, ws_rx) = socket.split();

    // Admission check against the committed snapshot before streaming.
    match state.store.snapshot(&party_id) {
        None => {
            let _ = send_close(&mut ws_tx, CLOSE_NOT_FOUND, "Party not found").await;
            return;
        }
        Some(party_state) => {
            if party_state.party.is_closed() {
                let _ = send_close(&mut ws_tx, CLOSE_NOT_FOUND, "Party is closed").await;
                return;
            }
            if party_state.is_blacklisted(&user.id) {
                tracing::debug!(party_id, user_id = %user.id, "blacklisted ws refused");
                let _ = send_close(&mut ws_tx, CLOSE_FORBIDDEN, "You cannot access this party")
                    .await;
                return;
            }
        }
    }

    let channel = Scope::Party(party_id.clone()).channel();
    tracing::info!(party_id, user_id = %user.id, "party socket opened");
    run_session(&state, ws_tx, ws_rx, channel, Some((party_id.clone(), user.clone()))).await;
    tracing::info!(party_id, user_id = %user.id, "party socket ended");
}

async fn run_connection(socket: WebSocket, state: AppState, channel: String, sender: Option<(String, AuthUser)>) {
    let (ws_tx, ws_rx) = socket.split();
    run_session(&state, ws_tx, ws_rx, channel, sender).await;
}

/// Forward matching broadcasts to the socket; on party sockets also accept
/// `{"message": ...}` frames from active members.
async fn run_session(
    state: &AppState,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    channel: String,
    sender: Option<(String, AuthUser)>,
) {
    let mut broadcast_rx = state.hub.subscribe();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some((party_id, user)) = sender.as_ref() else {
                            // The lobby feed is read-only.
                            continue;
                        };
                        let frame: ClientFrame = match serde_json::from_str(&text) {
                            Ok(f) => f,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };
                        if let Err(e) = handle_chat_frame(state, party_id, user, frame).await {
                            tracing::debug!(party_id, user_id = %user.id, ?e, "chat frame dropped");
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, channel, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            result = broadcast_rx.recv() => {
                match result {
                    Ok(payload) => {
                        if payload.channel != channel {
                            continue;
                        }
                        let json = match serde_json::to_string(&payload.data) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!(?e, event = %payload.event_name, "event serialization failed");
                                continue;
                            }
                        };
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(channel, skipped = n, "socket lagged behind broadcast");
                        // Drop the missed events and keep streaming.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Persist a chat line and broadcast it to the room. Only active members
/// may speak; everyone subscribed (the sender included) hears the echo.
async fn handle_chat_frame(
    state: &AppState,
    party_id: &str,
    user: &AuthUser,
    frame: ClientFrame,
) -> Result<(), crate::error::ApiError> {
    let content = frame.message.trim();
    if content.is_empty() {
        return Ok(());
    }

    let party_state = state
        .store
        .snapshot(party_id)
        .ok_or_else(|| crate::error::ApiError::not_found("Party not found"))?;
    crate::policy::require_active_member(&party_state, &user.id)?;

    let message = state
        .chat
        .create_message(ChatMessage::user(party_id, &user.id, &user.nickname, content))
        .await?;

    state.hub.publish(
        &Scope::Party(party_id.to_string()),
        &PartyEvent::ChatMessage {
            message_id: message.id,
            sender: message.sender_name,
            sender_id: user.id.clone(),
            message: message.content,
        },
    );
    Ok(())
}

async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
