//! Session storage, live sync and chat orchestration for Screwit.

pub mod auth;
pub mod chat;
mod config;
pub mod db;
mod error;
pub mod messages;
pub mod planner;
pub mod sessions;
pub mod store;
pub mod sync;
pub mod users;
pub mod utils;

pub use auth::{register_identity, sign_in_or_register, IdentityProvider, LocalIdentityProvider};
pub use chat::ChatController;
pub use config::ChatConfig;
pub use db::SqliteStore;
pub use error::{ScrewitError, ValidationError};
pub use messages::MessageClient;
pub use planner::{PlanRequest, PlanResponse, Planner, SimulatedPlanner};
pub use sessions::SessionClient;
pub use store::{Collection, DocumentStore, SessionQuery, StoreChange};
pub use sync::{Subscription, SyncLayer, WatchKey};
pub use users::UserClient;

/// Result type for Screwit operations.
pub type Result<T> = std::result::Result<T, ScrewitError>;
