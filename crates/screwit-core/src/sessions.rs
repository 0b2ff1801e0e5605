//! Session store client.

use crate::store::{DocumentStore, SessionQuery};
use crate::utils::{enabled_capability_count, validate_new_session};
use crate::{Result, ScrewitError};
use screwit_types::{NewSession, Session, SessionStatus, SessionUpdate};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Typed create/read/update/soft-delete over the session collection.
#[derive(Clone)]
pub struct SessionClient {
    store: Arc<dyn DocumentStore>,
}

impl SessionClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a new active session with no messages.
    pub async fn create(&self, data: NewSession) -> Result<Session> {
        validate_new_session(&data)?;

        let now = self.store.server_time();
        let session = Session {
            id: Uuid::new_v4(),
            title: data.title,
            user_id: data.user_id,
            last_message: None,
            last_activity: now,
            created_at: now,
            updated_at: now,
            agent_options: data.agent_options.unwrap_or_default(),
            message_count: 0,
            status: SessionStatus::Active,
        };

        self.store.insert_session(&session).await.map_err(|e| {
            error!(target: "screwit::sessions", "Error creating chat session: {}", e);
            e
        })?;

        info!(
            target: "screwit::sessions",
            "Created session {} for user {} ({} capabilities enabled)",
            session.id,
            session.user_id,
            enabled_capability_count(&session.agent_options)
        );
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        self.store.get_session(id).await.map_err(|e| {
            error!(target: "screwit::sessions", "Error getting chat session {}: {}", id, e);
            e
        })
    }

    /// Active sessions of one user, most recent activity first.
    pub async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        self.store
            .query_sessions(&SessionQuery::active_for_user(user_id, limit))
            .await
            .map_err(|e| {
                error!(target: "screwit::sessions", "Error fetching sessions for user {}: {}", user_id, e);
                e
            })
    }

    /// Merge fields into a session. No business rules are checked here.
    pub async fn update(&self, id: Uuid, update: SessionUpdate) -> Result<()> {
        if update.is_empty() {
            debug!(target: "screwit::sessions", "Skipping empty update for session {}", id);
            return Ok(());
        }
        self.store.update_session(id, &update).await.map_err(|e| {
            error!(target: "screwit::sessions", "Error updating chat session {}: {}", id, e);
            e
        })?;
        debug!(target: "screwit::sessions", "Updated session {}", id);
        Ok(())
    }

    /// Mark the session deleted. Its record and messages stay readable by id.
    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.set_status(id, SessionStatus::Deleted).await
    }

    /// Hide the session from the active list.
    pub async fn archive(&self, id: Uuid) -> Result<()> {
        self.set_status(id, SessionStatus::Archived).await
    }

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        let update = SessionUpdate::status_change(status, self.store.server_time());
        self.update(id, update).await?;
        info!(target: "screwit::sessions", "Session {} marked {}", id, status);
        Ok(())
    }

    /// Fetch a session or fail with `SessionNotFound`.
    pub async fn require(&self, id: Uuid) -> Result<Session> {
        self.get(id).await?.ok_or(ScrewitError::SessionNotFound(id))
    }
}
