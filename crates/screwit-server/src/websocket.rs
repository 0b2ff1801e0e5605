//! Chat WebSocket connection handling.
//!
//! Each connection owns one [`ChatController`]. Client commands drive the
//! controller; every state change is pushed back as a full state message.

use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use screwit_core::utils::options_from_flags;
use screwit_core::ChatController;
use screwit_types::{AgentOption, AuthUser, WsClientMessage, WsServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Maximum size for prompt and message content (10KB)
const MAX_INPUT_SIZE: usize = 10 * 1024;

pub async fn handle_websocket(socket: WebSocket, state: Arc<AppState>, user_id: String) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let identity = match state.users.get(&user_id).await? {
        Some(user) => AuthUser {
            uid: user.id,
            display_name: Some(user.name),
            email: Some(user.email),
            photo_url: user.profile_picture,
        },
        None => AuthUser {
            uid: user_id.clone(),
            display_name: None,
            email: None,
            photo_url: None,
        },
    };

    let controller = Arc::new(state.chat_controller());
    controller.attach_user(Some(identity)).await;
    info!(target: "screwit::ws", "Chat socket opened for user {}", user_id);

    // Replies that are not state snapshots (pong, protocol errors).
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<WsServerMessage>(32);

    let mut states = WatchStream::new(controller.subscribe_state());
    let send_user = user_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = outgoing_rx.recv() => msg,
                Some(state) = states.next() => WsServerMessage::State { state },
                else => break,
            };
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(target: "screwit::ws", "Failed to encode message for user {}: {}", send_user, e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                debug!(target: "screwit::ws", "WebSocket send failed for user {}: {}", send_user, e);
                break;
            }
        }
    });

    let recv_controller = controller.clone();
    let recv_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match parse_client_message(&text, &recv_user) {
                Ok(client_msg) => dispatch(&recv_controller, client_msg, &recv_user).await,
                Err(err) => Some(err),
            };
            if let Some(reply) = reply {
                let _ = outgoing_tx.send(reply).await;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    controller.attach_user(None).await;
    controller.wait_for_pending_replies().await;
    info!(target: "screwit::ws", "Chat socket closed for user {}", user_id);
    Ok(())
}

fn parse_client_message(text: &str, user_id: &str) -> Result<WsClientMessage, WsServerMessage> {
    serde_json::from_str(text).map_err(|e| {
        debug!(target: "screwit::ws", "Malformed message from user {}: {}", user_id, e);
        WsServerMessage::Error {
            code: "invalid_message".to_string(),
            message: e.to_string(),
        }
    })
}

/// Apply one client command. Failures of chat transitions are already
/// reflected in the pushed state, so only protocol-level replies are returned.
async fn dispatch(
    controller: &ChatController,
    msg: WsClientMessage,
    user_id: &str,
) -> Option<WsServerMessage> {
    match msg {
        WsClientMessage::CreateChat {
            prompt,
            agent_options,
        } => {
            if let Some(err) = oversized(&prompt, user_id) {
                return Some(err);
            }
            if controller.create_new_chat(&prompt, &agent_options).await.is_ok() {
                let _ = controller.send_message(&prompt, &agent_options).await;
            }
            None
        }
        WsClientMessage::SendMessage {
            content,
            agent_options,
        } => {
            if let Some(err) = oversized(&content, user_id) {
                return Some(err);
            }
            let options = agent_options.unwrap_or_else(|| active_session_options(controller));
            let _ = controller.send_message(&content, &options).await;
            None
        }
        WsClientMessage::SwitchChat { session_id } => {
            let _ = controller.switch_to_chat(session_id).await;
            None
        }
        WsClientMessage::DeleteChat { session_id } => {
            let _ = controller.delete_chat(session_id).await;
            None
        }
        WsClientMessage::ArchiveChat { session_id } => {
            let _ = controller.archive_chat(session_id).await;
            None
        }
        WsClientMessage::ClearError => {
            controller.clear_error();
            None
        }
        WsClientMessage::Ping { timestamp } => {
            tracing::trace!(target: "screwit::ws::ping", "Pong for user {}: {}", user_id, timestamp);
            Some(WsServerMessage::Pong { timestamp })
        }
    }
}

fn oversized(content: &str, user_id: &str) -> Option<WsServerMessage> {
    if content.len() <= MAX_INPUT_SIZE {
        return None;
    }
    warn!(
        target: "screwit::ws",
        "Input too large ({} bytes) from user {}, max {} bytes",
        content.len(),
        user_id,
        MAX_INPUT_SIZE
    );
    Some(WsServerMessage::Error {
        code: "input_too_large".to_string(),
        message: format!("Input must be {} bytes or less", MAX_INPUT_SIZE),
    })
}

/// Options stored on the active session, used when a message arrives
/// without its own toggles.
fn active_session_options(controller: &ChatController) -> Vec<AgentOption> {
    let state = controller.state();
    state
        .active_session_id
        .and_then(|id| state.sessions.iter().find(|s| s.id == id))
        .map(|session| options_from_flags(&session.agent_options))
        .unwrap_or_default()
}
