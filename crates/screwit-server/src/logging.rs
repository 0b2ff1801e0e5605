//! Logging configuration and initialization.
//!
//! Presets pick a base verbosity per `screwit::*` target; `--log` flags
//! override single targets; `RUST_LOG` replaces everything when set.

use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const TARGET_PREFIX: &str = "screwit::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Base verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Lifecycle events, request summaries and failures.
    #[default]
    Production,
    /// Everything at info.
    Verbose,
    /// Debug detail, without keepalive noise.
    Debug,
    Trace,
    /// Warnings and errors only.
    Quiet,
}

impl LogPreset {
    fn directives(&self) -> &'static [&'static str] {
        match self {
            LogPreset::Production => &[
                "screwit::startup=info",
                "screwit::api=info",
                "screwit::ws=info",
                "screwit::ws::ping=off",
                "screwit::chat=info",
                "screwit::sessions=info",
                "screwit::messages=warn",
                "screwit::sync=warn",
                "screwit::planner=info",
                "screwit::auth=info",
                "screwit::store=warn",
                "tower_http=warn",
            ],
            LogPreset::Verbose => &["screwit=info", "screwit::ws::ping=off", "tower_http=info"],
            LogPreset::Debug => &["screwit=debug", "screwit::ws::ping=off", "tower_http=debug"],
            LogPreset::Trace => &["screwit=trace", "tower_http=trace"],
            LogPreset::Quiet => &["screwit=warn", "tower_http=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Full target name to level, e.g. `screwit::sync` -> DEBUG.
    pub overrides: BTreeMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Build from CLI flags. The quietest explicit flag wins:
    /// quiet, then trace, debug, verbose.
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let preset = match (quiet, trace, debug, verbose) {
            (true, ..) => LogPreset::Quiet,
            (_, true, ..) => LogPreset::Trace,
            (_, _, true, _) => LogPreset::Debug,
            (.., true) => LogPreset::Verbose,
            _ => LogPreset::Production,
        };

        let overrides = log_overrides
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter_map(parse_override)
            .collect();

        Self {
            preset,
            overrides,
            format,
        }
    }

    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        let directives: Vec<String> = self
            .preset
            .directives()
            .iter()
            .map(|d| d.to_string())
            .chain(
                self.overrides
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level.as_str().to_lowercase())),
            )
            .collect();

        EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Parse one `target=level` pair. Short targets get the `screwit::` prefix.
fn parse_override(part: &str) -> Option<(String, Level)> {
    let (target, level) = part.split_once('=')?;
    let target = target.trim();
    let level = Level::from_str(level.trim()).ok()?;

    let full_target = if target.starts_with(TARGET_PREFIX) || target == "tower_http" {
        target.to_string()
    } else {
        format!("{}{}", TARGET_PREFIX, target)
    };
    Some((full_target, level))
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_preset_priority() {
        let preset = |v, d, t, q| LogConfig::from_cli(v, d, t, q, vec![], LogFormat::Text).preset;

        assert_eq!(preset(true, true, true, true), LogPreset::Quiet);
        assert_eq!(preset(true, true, true, false), LogPreset::Trace);
        assert_eq!(preset(true, true, false, false), LogPreset::Debug);
        assert_eq!(preset(true, false, false, false), LogPreset::Verbose);
        assert_eq!(preset(false, false, false, false), LogPreset::Production);
    }

    #[test]
    fn test_overrides_parsing() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["sync=debug".into(), "ws::ping=trace,planner=warn".into(), "bogus=loud".into()],
            LogFormat::Text,
        );

        assert_eq!(config.overrides.get("screwit::sync"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("screwit::ws::ping"), Some(&Level::TRACE));
        assert_eq!(config.overrides.get("screwit::planner"), Some(&Level::WARN));
        assert!(!config.overrides.contains_key("screwit::bogus"));
    }

    #[test]
    fn test_full_target_passthrough() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["screwit::chat=trace".into(), "tower_http=debug".into()],
            LogFormat::Json,
        );

        assert_eq!(config.overrides.get("screwit::chat"), Some(&Level::TRACE));
        assert_eq!(config.overrides.get("tower_http"), Some(&Level::DEBUG));
        assert_eq!(config.format, LogFormat::Json);
    }
}
