//! Shared application state.

use crate::config::Config;
use screwit_core::{
    ChatConfig, ChatController, DocumentStore, MessageClient, Planner, SessionClient,
    SimulatedPlanner, SqliteStore, UserClient,
};
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub sessions: SessionClient,
    pub messages: MessageClient,
    pub users: UserClient,
    pub planner: Arc<dyn Planner>,
    pub chat_config: ChatConfig,
    pub config: Config,
}

impl AppState {
    /// Open the database at `config.db_path` and wire the clients.
    pub fn new(config: Config) -> screwit_core::Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open(&config.db_path)?);
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let chat_config = config.chat_config();
        let planner: Arc<dyn Planner> = Arc::new(SimulatedPlanner::new(chat_config.reply_delay));

        Self {
            sessions: SessionClient::new(store.clone()),
            messages: MessageClient::new(store.clone()),
            users: UserClient::new(store.clone()),
            store,
            planner,
            chat_config,
            config,
        }
    }

    /// A fresh controller for one client connection.
    pub fn chat_controller(&self) -> ChatController {
        ChatController::new(self.store.clone(), self.planner.clone(), self.chat_config.clone())
    }
}
