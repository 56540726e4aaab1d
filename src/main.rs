//! embassy-market - Solana market data aggregator
//!
//! Reads configuration, wires every enabled provider into the aggregator and
//! runs one CLI command against it.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, EnvFilter};

use embassy_market::adapters::cli::{self, CliApp};
use embassy_market::application::MarketDataAggregator;
use embassy_market::config::{load_config, Config, LoggingSection};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the TOML)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = resolve_config(app.config.as_deref())?;
    init_logging(app.verbose, app.debug, &config.logging)?;

    let aggregator = Arc::new(MarketDataAggregator::from_config(&config));
    tracing::debug!("Sources registered: {:?}", aggregator.source_ids());

    cli::execute(app.command, aggregator, app.json).await
}

/// Explicit `--config`, else config/default.toml when present, else defaults
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_config(DEFAULT_CONFIG_PATH).context("Failed to load configuration");
    }

    Ok(Config::default())
}

fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    match logging.log_file_path() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // stdout carries command output
        None => fmt().with_env_filter(filter).with_writer(std::io::stderr).init(),
    }

    Ok(())
}
