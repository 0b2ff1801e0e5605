//! WebSocket message protocol between client and server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AgentOption, ChatState};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Start a new chat from the first prompt.
    CreateChat {
        prompt: String,
        #[serde(default)]
        agent_options: Vec<AgentOption>,
    },
    /// Append a user message to the active chat.
    SendMessage {
        content: String,
        #[serde(default)]
        agent_options: Option<Vec<AgentOption>>,
    },
    /// Make another chat the active one.
    SwitchChat { session_id: Uuid },
    /// Soft-delete a chat.
    DeleteChat { session_id: Uuid },
    /// Archive a chat.
    ArchiveChat { session_id: Uuid },
    /// Dismiss the current error.
    ClearError,
    /// Ping for keepalive.
    Ping { timestamp: u64 },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Full chat state; sent on connect and after every change.
    State { state: ChatState },
    /// Pong response.
    Pong { timestamp: u64 },
    /// Protocol-level error (malformed input).
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tagging() {
        let msg: WsClientMessage =
            serde_json::from_str(r#"{"type":"send_message","content":"Book a DJ"}"#).unwrap();
        match msg {
            WsClientMessage::SendMessage {
                content,
                agent_options,
            } => {
                assert_eq!(content, "Book a DJ");
                assert!(agent_options.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_create_chat_defaults_options() {
        let msg: WsClientMessage =
            serde_json::from_str(r#"{"type":"create_chat","prompt":"Halloween party"}"#).unwrap();
        assert!(matches!(
            msg,
            WsClientMessage::CreateChat { ref agent_options, .. } if agent_options.is_empty()
        ));
    }

    #[test]
    fn test_server_state_serialization() {
        let msg = WsServerMessage::State {
            state: ChatState::default(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["state"]["loading"], false);
    }
}
