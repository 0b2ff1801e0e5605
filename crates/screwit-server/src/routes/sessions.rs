//! Chat session routes.

use super::{api_error, require_user_id, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use screwit_core::utils::{
    derive_title, format_relative_time, is_session_owned_by_user, is_session_stale,
    normalize_agent_options,
};
use screwit_core::ScrewitError;
use screwit_types::{AgentOption, NewSession, Session};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    /// e.g. "5m ago".
    pub last_activity_label: String,
    pub stale: bool,
}

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionListResponse>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let sessions = state
        .sessions
        .list_for_user(&user_id, state.chat_config.session_list_limit)
        .await
        .map_err(api_error)?;

    let now = Utc::now();
    let stale_days = state.config.stale_after_days;
    let sessions = sessions
        .into_iter()
        .map(|session| SessionSummary {
            last_activity_label: format_relative_time(session.last_activity, now),
            stale: is_session_stale(&session, stale_days, now),
            session,
        })
        .collect();

    Ok(Json(SessionListResponse { sessions }))
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    /// First prompt; the title is derived from it.
    pub prompt: String,
    #[serde(default)]
    pub agent_options: Vec<AgentOption>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let user_id = require_user_id(&headers)?;
    let session = state
        .sessions
        .create(NewSession {
            title: derive_title(&req.prompt, state.chat_config.title_max_len),
            user_id,
            agent_options: Some(normalize_agent_options(&req.agent_options)),
        })
        .await
        .map_err(api_error)?;

    info!(target: "screwit::api", "Created session {} via API", session.id);
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let session = owned_session(&state, id, &user_id).await?;
    Ok(Json(session))
}

pub async fn archive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user_id(&headers)?;
    owned_session(&state, id, &user_id).await?;
    state.sessions.archive(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft delete; the record stays readable by id.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user_id(&headers)?;
    owned_session(&state, id, &user_id).await?;
    state.sessions.soft_delete(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Look up a session, answering 404 for sessions of other users.
pub(crate) async fn owned_session(
    state: &AppState,
    id: Uuid,
    user_id: &str,
) -> Result<Session, ApiError> {
    let session = state.sessions.require(id).await.map_err(api_error)?;
    if !is_session_owned_by_user(&session, user_id) {
        return Err(api_error(ScrewitError::SessionNotFound(id)));
    }
    Ok(session)
}
