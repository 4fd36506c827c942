//! # RegionGuard - Main Entry Point
//!
//! Daemon hosting the region index and flag resolver for a set of worlds.
//! This entry point handles CLI parsing, configuration loading, logging and
//! the application lifecycle.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! regionguard
//!
//! # Specify custom configuration
//! regionguard --config production.toml
//!
//! # Override specific settings
//! regionguard --data-dir /srv/regions --index chunk --world overworld --world nether
//!
//! # JSON logging for production
//! regionguard --json-logs
//! ```
//!
//! ## Configuration
//!
//! Configuration is read from a TOML file (default: `config.toml`). If the
//! file doesn't exist, a default configuration is written there first.
//!
//! ## Signal Handling
//!
//! SIGINT (Ctrl+C) and SIGTERM save every world before exiting. A second
//! signal exits immediately.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use anyhow::Context;
use app::Application;
use cli::CliArgs;
use config::AppConfig;

pub use config::{IndexSettings, LoggingSettings, StorageSettings, WorldSettings};

/// Parses arguments, loads configuration, sets up logging and runs until
/// shutdown.
pub async fn init() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", args.config_path.display()))?;
    config.apply_cli(&args);

    logging::setup_logging(&config.logging, args.json_logs).context("Failed to setup logging")?;
    tracing::info!("✅ Configuration loaded from {}", args.config_path.display());

    Application::new(config)?.run().await
}
