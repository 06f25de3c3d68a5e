//! Scribe CLI - Main entry point.
//!
//! Launches the interactive TUI against the configured templates/chat
//! backend. Logs go to a file so the terminal stays clean for the UI.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scribe_engine::ScribeConfig;

#[derive(Debug, Parser)]
#[command(name = "scribe", about = "Template assistant with streaming chat", version)]
struct Cli {
    /// Base URL of the templates/chat backend.
    #[arg(long, env = "SCRIBE_API_URL")]
    api_url: Option<String>,

    /// Write logs to this file instead of the default location.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ScribeConfig::load().context("failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    // Keep the guard alive so buffered log lines flush on exit.
    let _log_guard = init_tracing(&config, cli.log_file)?;
    tracing::info!(api_url = %config.api_url, "starting scribe");

    scribe_tui::run(config).await
}

/// Set up file logging. `RUST_LOG` overrides the configured filter.
fn init_tracing(
    config: &ScribeConfig,
    log_file: Option<PathBuf>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let path = match log_file {
        Some(path) => path,
        None => {
            let dir = dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("scribe");
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            dir.join("scribe.log")
        }
    };
    let file = fs::File::create(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone()));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    Ok(guard)
}
