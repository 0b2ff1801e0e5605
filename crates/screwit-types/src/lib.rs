//! Shared types for the Screwit event-planning assistant.

mod agent;
mod chat;
mod session;
mod user;
mod ws;

pub use agent::*;
pub use chat::*;
pub use session::*;
pub use user::*;
pub use ws::*;
