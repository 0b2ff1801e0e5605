//! Chat session types and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CapabilityFlags;

/// Maximum length of a session title, in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum length of the last-message preview, in characters.
pub const MAX_PREVIEW_LEN: usize = 100;

/// Session status in the lifecycle.
///
/// Deletion is logical: a deleted session stays readable by id but is
/// excluded from the active session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Listed in the user's session list.
    Active,
    /// Hidden from the default list but kept.
    Archived,
    /// Soft-deleted.
    Deleted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Archived => "archived",
            SessionStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown session status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "archived" => Ok(SessionStatus::Archived),
            "deleted" => Ok(SessionStatus::Deleted),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A persisted conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Derived from the first user prompt.
    pub title: String,
    /// Owning user (identity-provider id).
    pub user_id: String,
    /// Preview of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Capabilities enabled when the session was created.
    pub agent_options: CapabilityFlags,
    /// Recomputed from the message collection after each append.
    pub message_count: u32,
    pub status: SessionStatus,
}

/// Payload for creating a session.
///
/// `agent_options` is optional so that a payload missing its capability
/// flags can be represented and rejected by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    pub user_id: String,
    #[serde(default)]
    pub agent_options: Option<CapabilityFlags>,
}

/// Partial update merged into a stored session.
///
/// Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_options: Option<CapabilityFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

impl SessionUpdate {
    /// Status transition stamped with `now`.
    pub fn status_change(status: SessionStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(now),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.last_message.is_none()
            && self.last_activity.is_none()
            && self.updated_at.is_none()
            && self.agent_options.is_none()
            && self.message_count.is_none()
            && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Archived,
            SessionStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("stopped".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
    }

    #[test]
    fn test_status_change_stamps_updated_at() {
        let now = Utc::now();
        let update = SessionUpdate::status_change(SessionStatus::Deleted, now);
        assert_eq!(update.status, Some(SessionStatus::Deleted));
        assert_eq!(update.updated_at, Some(now));
        assert!(update.last_activity.is_none());
        assert!(!update.is_empty());
        assert!(SessionUpdate::default().is_empty());
    }
}
