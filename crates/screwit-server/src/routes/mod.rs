//! HTTP route handlers.

pub mod auth;
pub mod messages;
pub mod sessions;
pub mod ws;

use crate::state::AppState;
use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use screwit_core::ScrewitError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

pub type ApiError = (StatusCode, String);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/users/{id}", get(auth::get_user))
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/sessions/{id}", get(sessions::get).delete(sessions::delete))
        .route("/sessions/{id}/archive", post(sessions::archive))
        .route("/sessions/{id}/messages", get(messages::list));

    let ws_routes = Router::new().route("/chat", get(ws::upgrade));

    Router::new()
        .nest("/api", api_routes)
        .nest("/ws", ws_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a core error onto an HTTP status.
pub fn api_error(e: ScrewitError) -> ApiError {
    let status = match &e {
        ScrewitError::Validation(_) | ScrewitError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
        ScrewitError::AuthRequired | ScrewitError::SignInFailed(_) => StatusCode::UNAUTHORIZED,
        ScrewitError::SessionNotFound(_) | ScrewitError::NoActiveSession => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(target: "screwit::api", "Request failed: {}", e);
    }
    (status, e.to_string())
}

/// Caller identity from the `x-user-id` header.
pub fn require_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| api_error(ScrewitError::AuthRequired))
}
