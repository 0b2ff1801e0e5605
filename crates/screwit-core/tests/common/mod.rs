//! Common test utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use screwit_core::{
    ChatConfig, ChatController, DocumentStore, PlanRequest, PlanResponse, Planner, Result,
    ScrewitError, SessionQuery, SimulatedPlanner, SqliteStore, StoreChange,
};
use screwit_types::{AgentOption, AuthUser, Capability, Message, Session, SessionUpdate, User};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fresh in-memory store.
pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

/// Config with a short simulated reply delay.
pub fn fast_config(reply_delay: Duration) -> ChatConfig {
    ChatConfig {
        reply_delay,
        ..Default::default()
    }
}

/// Controller backed by the simulated planner.
pub fn simulated_controller(store: Arc<dyn DocumentStore>, reply_delay: Duration) -> ChatController {
    let config = fast_config(reply_delay);
    let planner = Arc::new(SimulatedPlanner::new(config.reply_delay));
    ChatController::new(store, planner, config)
}

pub fn test_user(uid: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        display_name: Some(format!("User {}", uid)),
        email: Some(format!("{}@dartmouth.edu", uid)),
        photo_url: None,
    }
}

/// All four capabilities, with restaurants and events switched on.
pub fn capability_options() -> Vec<AgentOption> {
    Capability::ALL
        .into_iter()
        .map(|cap| {
            AgentOption::from_capability(cap, matches!(cap, Capability::Restaurants | Capability::Events))
        })
        .collect()
}

/// Planner that always fails.
pub struct FailingPlanner;

#[async_trait]
impl Planner for FailingPlanner {
    async fn plan(&self, _request: PlanRequest) -> Result<PlanResponse> {
        Err(ScrewitError::Planner("service unavailable".to_string()))
    }
}

/// Planner that never answers within any reasonable timeout.
pub struct StalledPlanner;

#[async_trait]
impl Planner for StalledPlanner {
    async fn plan(&self, _request: PlanRequest) -> Result<PlanResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ScrewitError::Planner("unreachable".to_string()))
    }
}

/// Store whose every operation fails.
pub struct FailingStore {
    changes_tx: broadcast::Sender<StoreChange>,
}

impl FailingStore {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(8);
        Self { changes_tx }
    }

    fn unavailable<T>() -> Result<T> {
        Err(ScrewitError::Store("unavailable".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes_tx.subscribe()
    }

    async fn insert_session(&self, _session: &Session) -> Result<()> {
        Self::unavailable()
    }

    async fn get_session(&self, _id: Uuid) -> Result<Option<Session>> {
        Self::unavailable()
    }

    async fn query_sessions(&self, _query: &SessionQuery) -> Result<Vec<Session>> {
        Self::unavailable()
    }

    async fn update_session(&self, _id: Uuid, _update: &SessionUpdate) -> Result<()> {
        Self::unavailable()
    }

    async fn insert_message(&self, _message: &Message) -> Result<()> {
        Self::unavailable()
    }

    async fn query_messages(&self, _chat_session_id: Uuid, _limit: Option<usize>) -> Result<Vec<Message>> {
        Self::unavailable()
    }

    async fn count_messages(&self, _chat_session_id: Uuid) -> Result<u32> {
        Self::unavailable()
    }

    async fn insert_user(&self, _user: &User) -> Result<()> {
        Self::unavailable()
    }

    async fn get_user(&self, _id: &str) -> Result<Option<User>> {
        Self::unavailable()
    }

    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>> {
        Self::unavailable()
    }
}
