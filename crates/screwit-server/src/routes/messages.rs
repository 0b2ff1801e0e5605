//! Message history route.

use super::sessions::owned_session;
use super::{api_error, require_user_id, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use screwit_types::Message;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct MessageListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub total: u32,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let user_id = require_user_id(&headers)?;
    owned_session(&state, id, &user_id).await?;

    let limit = query
        .limit
        .unwrap_or(state.chat_config.message_list_limit)
        .min(state.chat_config.message_list_limit);
    let messages = state
        .messages
        .list_for_session(id, limit)
        .await
        .map_err(api_error)?;
    let total = state.messages.count_for_session(id).await.map_err(api_error)?;

    Ok(Json(MessageListResponse { messages, total }))
}
