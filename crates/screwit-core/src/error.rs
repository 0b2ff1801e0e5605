//! Error types for Screwit.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Rejected session payloads. Raised before any store call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Chat title is required")]
    TitleRequired,

    #[error("Chat title must be {max} characters or less")]
    TitleTooLong { max: usize },

    #[error("User ID is required")]
    UserIdRequired,

    #[error("Agent options are required")]
    AgentOptionsRequired,

    #[error("Message content is required")]
    ContentRequired,
}

#[derive(Error, Debug)]
pub enum ScrewitError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("User must be authenticated")]
    AuthRequired,

    #[error("No active chat session")]
    NoActiveSession,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Planner timed out after {0:?}")]
    PlannerTimeout(Duration),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
