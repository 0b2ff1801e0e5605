//! Sign-in and user profile routes.

use super::{api_error, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use screwit_core::register_identity;
use screwit_core::ScrewitError;
use screwit_types::{AuthProvider, AuthUser, User};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub provider: String,
    /// Identity already verified by the provider.
    pub identity: AuthUser,
}

/// Register the identity on first sign-in and return its profile.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<User>, ApiError> {
    let provider: AuthProvider = req.provider.parse().map_err(|e: screwit_types::UnsupportedProvider| {
        warn!(target: "screwit::api", "Rejected sign-in: {}", e);
        api_error(ScrewitError::UnsupportedProvider(e.0))
    })?;

    if req.identity.uid.trim().is_empty() {
        return Err(api_error(ScrewitError::SignInFailed(
            "identity has no uid".to_string(),
        )));
    }

    let user = register_identity(&req.identity, provider, &state.users)
        .await
        .map_err(api_error)?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    state
        .users
        .get(&id)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))
}
