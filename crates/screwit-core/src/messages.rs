//! Message store client.

use crate::store::DocumentStore;
use crate::utils::truncate_chars;
use crate::{Result, ScrewitError};
use screwit_types::{Message, NewMessage, SessionUpdate, MAX_PREVIEW_LEN};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Typed create/list/count over the message collection.
///
/// Messages are immutable; there is no update or delete.
#[derive(Clone)]
pub struct MessageClient {
    store: Arc<dyn DocumentStore>,
}

impl MessageClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist a message and refresh its parent session.
    ///
    /// The session's count is recomputed with a full count query after the
    /// insert. Two concurrent creates can both observe a stale count; the
    /// next create repairs it.
    ///
    /// Fails with `SessionNotFound` before writing anything when the parent
    /// session does not exist.
    pub async fn create(&self, data: NewMessage) -> Result<Message> {
        if self.store.get_session(data.chat_session_id).await?.is_none() {
            error!(
                target: "screwit::messages",
                "Refusing message for unknown session {}",
                data.chat_session_id
            );
            return Err(ScrewitError::SessionNotFound(data.chat_session_id));
        }

        let now = self.store.server_time();
        let message = Message {
            id: Uuid::new_v4(),
            role: data.role,
            content: data.content,
            chat_session_id: data.chat_session_id,
            timestamp: now,
            metadata: data.metadata,
        };

        self.store.insert_message(&message).await.map_err(|e| {
            error!(target: "screwit::messages", "Error creating message: {}", e);
            e
        })?;

        let message_count = self.count_for_session(message.chat_session_id).await?;
        let update = SessionUpdate {
            last_activity: Some(now),
            updated_at: Some(now),
            last_message: Some(truncate_chars(&message.content, MAX_PREVIEW_LEN)),
            message_count: Some(message_count),
            ..Default::default()
        };
        self.store
            .update_session(message.chat_session_id, &update)
            .await
            .map_err(|e| {
                error!(
                    target: "screwit::messages",
                    "Error updating session {} after message {}: {}",
                    message.chat_session_id, message.id, e
                );
                e
            })?;

        debug!(
            target: "screwit::messages",
            "Stored {} message {} in session {} (count {})",
            message.role, message.id, message.chat_session_id, message_count
        );
        Ok(message)
    }

    /// Messages of a session, oldest first, capped at `limit`.
    pub async fn list_for_session(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        self.store
            .query_messages(session_id, Some(limit))
            .await
            .map_err(|e| {
                error!(target: "screwit::messages", "Error fetching messages for session {}: {}", session_id, e);
                e
            })
    }

    /// Every message of a session, oldest first.
    pub async fn list_all_for_session(&self, session_id: Uuid) -> Result<Vec<Message>> {
        self.store.query_messages(session_id, None).await.map_err(|e| {
            error!(target: "screwit::messages", "Error fetching messages for session {}: {}", session_id, e);
            e
        })
    }

    pub async fn count_for_session(&self, session_id: Uuid) -> Result<u32> {
        self.store.count_messages(session_id).await.map_err(|e| {
            error!(target: "screwit::messages", "Error counting messages for session {}: {}", session_id, e);
            e
        })
    }
}
