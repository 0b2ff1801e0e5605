//! Server configuration.

use anyhow::Result;
use screwit_core::ChatConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_session_list_limit")]
    pub session_list_limit: usize,
    #[serde(default = "default_message_list_limit")]
    pub message_list_limit: usize,
    /// Delay before the simulated planner answers.
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_planner_timeout_ms")]
    pub planner_timeout_ms: u64,
    /// Idle days after which a listed session is flagged stale.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("screwit")
        .join("screwit.db")
}

fn default_session_list_limit() -> usize {
    50
}

fn default_message_list_limit() -> usize {
    100
}

fn default_reply_delay_ms() -> u64 {
    1000
}

fn default_planner_timeout_ms() -> u64 {
    30_000
}

fn default_stale_after_days() -> u32 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            session_list_limit: default_session_list_limit(),
            message_list_limit: default_message_list_limit(),
            reply_delay_ms: default_reply_delay_ms(),
            planner_timeout_ms: default_planner_timeout_ms(),
            stale_after_days: default_stale_after_days(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }

    /// Chat-layer settings derived from this config.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            session_list_limit: self.session_list_limit,
            message_list_limit: self.message_list_limit,
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            planner_timeout: Duration::from_millis(self.planner_timeout_ms),
            ..ChatConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("screwit.toml");
        std::fs::write(&path, "port = 9000\nreply_delay_ms = 250\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.session_list_limit, 50);

        let chat = config.chat_config();
        assert_eq!(chat.reply_delay, Duration::from_millis(250));
        assert_eq!(chat.planner_timeout, Duration::from_secs(30));
        assert_eq!(chat.message_list_limit, 100);
    }

    #[test]
    fn test_default_db_path_is_namespaced() {
        let config = Config::default();
        assert!(config.db_path.ends_with("screwit/screwit.db"));
    }
}
