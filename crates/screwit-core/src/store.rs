//! Document store port.
//!
//! Everything above this module talks to persistence through
//! [`DocumentStore`]. The store owns ordering, durability and change fan-out;
//! callers never cache across calls.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use screwit_types::{Message, Session, SessionStatus, SessionUpdate, User};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Collections exposed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    ChatSessions,
    Messages,
    Users,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::ChatSessions => "chatSessions",
            Collection::Messages => "messages",
            Collection::Users => "users",
        }
    }
}

/// Change notification emitted after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Session { id: Uuid, user_id: String },
    Message { id: Uuid, chat_session_id: Uuid },
    User { id: String },
}

impl StoreChange {
    pub fn collection(&self) -> Collection {
        match self {
            StoreChange::Session { .. } => Collection::ChatSessions,
            StoreChange::Message { .. } => Collection::Messages,
            StoreChange::User { .. } => Collection::Users,
        }
    }
}

/// Filtered, ordered session query. Results are ordered by last activity,
/// most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuery {
    pub user_id: String,
    /// `None` matches every status.
    pub status: Option<SessionStatus>,
    pub limit: usize,
}

impl SessionQuery {
    pub fn active_for_user(user_id: impl Into<String>, limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            status: Some(SessionStatus::Active),
            limit,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Timestamp in the store's native precision.
    fn server_time(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    /// Subscribe to the change feed.
    fn changes(&self) -> broadcast::Receiver<StoreChange>;

    async fn insert_session(&self, session: &Session) -> Result<()>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    async fn query_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>>;

    /// Merge `update` into the stored session. Fails with
    /// `SessionNotFound` when no such session exists.
    async fn update_session(&self, id: Uuid, update: &SessionUpdate) -> Result<()>;

    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Messages of one session, oldest first.
    async fn query_messages(&self, chat_session_id: Uuid, limit: Option<usize>)
        -> Result<Vec<Message>>;

    async fn count_messages(&self, chat_session_id: Uuid) -> Result<u32>;

    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
