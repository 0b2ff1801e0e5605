//! WebSocket route handler.

use crate::state::AppState;
use crate::websocket::handle_websocket;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ChatSocketQuery {
    pub user_id: String,
}

pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatSocketQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = query.user_id.trim().to_string();
    if user_id.is_empty() {
        return (StatusCode::UNAUTHORIZED, "User must be authenticated").into_response();
    }
    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    if let Err(e) = handle_websocket(socket, state, user_id.clone()).await {
        tracing::error!(target: "screwit::ws", "WebSocket error for user {}: {}", user_id, e);
    }
}
