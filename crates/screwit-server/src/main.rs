//! Screwit server - HTTP/WebSocket back end for the event-planning chat.

use anyhow::Result;
use clap::Parser;
use screwit_server::{config::Config, logging, routes, state::AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use logging::{LogConfig, LogFormat};

/// Screwit server - event-planning chat back end.
#[derive(Parser, Debug)]
#[command(name = "screwit-server")]
#[command(about = "HTTP/WebSocket server for the Screwit event-planning chat")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override database path from config
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Enable verbose logging (INFO level for all targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (DEBUG level, excludes ping traces)
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "sync=debug" or "ws::ping=trace").
    /// Can be repeated. Targets are prefixed with "screwit::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    tracing::info!(
        target: "screwit::startup",
        "Loaded configuration (port: {}, db: {})",
        config.port,
        config.db_path.display()
    );

    let state = Arc::new(AppState::new(config.clone())?);
    tracing::info!(target: "screwit::startup", "Opened store and initialized application state");

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "screwit::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "screwit::startup", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "screwit::startup", "Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
