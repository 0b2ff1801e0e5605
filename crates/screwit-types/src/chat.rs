//! Chat message types and the client-facing chat state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{AgentOption, Session};

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person planning the event.
    User,
    /// The planning assistant.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for MessageRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Optional data attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Capability toggles in effect for this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_options: Vec<AgentOption>,
    /// How long the planner took, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    /// Data sources consulted for the reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// One immutable turn within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub chat_session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Payload for appending a message to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub chat_session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl NewMessage {
    pub fn user(chat_session_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            chat_session_id,
            metadata: None,
        }
    }

    pub fn assistant(
        chat_session_id: Uuid,
        content: impl Into<String>,
        metadata: MessageMetadata,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            chat_session_id,
            metadata: Some(metadata),
        }
    }

    pub fn with_metadata(mut self, metadata: Option<MessageMetadata>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Snapshot of one client's chat view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    /// Active sessions, most recent activity first.
    pub sessions: Vec<Session>,
    pub active_session_id: Option<Uuid>,
    /// Messages of the active session, oldest first.
    pub active_messages: Vec<Message>,
    pub loading: bool,
    /// Message of the last failed transition.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
        assert_eq!("user".parse::<MessageRole>().unwrap(), MessageRole::User);
        assert!("system".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_empty_metadata_fields_are_omitted() {
        let metadata = MessageMetadata {
            sources: vec!["Amazon API".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("agent_options").is_none());
        assert!(json.get("processing_time_ms").is_none());
        assert_eq!(json["sources"][0], "Amazon API");
    }

    #[test]
    fn test_new_user_message_has_no_metadata() {
        let session_id = Uuid::new_v4();
        let msg = NewMessage::user(session_id, "Book a DJ");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.chat_session_id, session_id);
        assert!(msg.metadata.is_none());
    }
}
