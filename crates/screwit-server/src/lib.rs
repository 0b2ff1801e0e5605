//! Screwit server library - HTTP/WebSocket surface for the event-planning chat.
//!
//! Routes, WebSocket handling and application state live here, separate from
//! main.rs, so integration tests can build the router directly.

pub mod config;
pub mod logging;
pub mod routes;
pub mod state;
pub mod websocket;
