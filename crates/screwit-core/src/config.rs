//! Tunables for the chat layer.

use crate::db::DEFAULT_CHANGE_BUFFER;
use crate::utils::DEFAULT_TITLE_MAX_LEN;
use std::time::Duration;

/// Configuration shared by the store clients, sync layer and controller.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum sessions returned by the active session list.
    pub session_list_limit: usize,
    /// Maximum messages loaded when switching chats.
    pub message_list_limit: usize,
    /// Maximum length of a derived title.
    pub title_max_len: usize,
    /// Delay before the simulated planner replies.
    pub reply_delay: Duration,
    /// Upper bound on a planner call.
    pub planner_timeout: Duration,
    /// Capacity of the store's change feed.
    pub change_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            session_list_limit: 50,
            message_list_limit: 100,
            title_max_len: DEFAULT_TITLE_MAX_LEN,
            reply_delay: Duration::from_secs(1),
            planner_timeout: Duration::from_secs(30),
            change_buffer: DEFAULT_CHANGE_BUFFER,
        }
    }
}
