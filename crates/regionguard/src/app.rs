//! Main application logic and lifecycle management.
//!
//! [`Application`] loads the configured worlds, keeps the background saver
//! and loader running, and on shutdown saves and unloads every world.

use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::{setup_signal_handlers, wait_for_signal};
use anyhow::anyhow;
use region_core::FlagRegistry;
use region_store::{JsonFileDriver, OpOutcome, RegionContainer, ShutdownState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long background tasks get to notice shutdown before being aborted.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Application {
    config: AppConfig,
    container: RegionContainer,
}

impl Application {
    /// Creates the application from a validated configuration.
    ///
    /// Region data lives in JSON files under `storage.data_dir`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;
        let container_config = config.to_container_config().map_err(|e| anyhow!(e))?;

        let driver = Arc::new(JsonFileDriver::new(&config.storage.data_dir));
        let registry = Arc::new(FlagRegistry::with_defaults());
        info!("🚩 {} flags registered", registry.len());

        let container = RegionContainer::new(driver, registry, container_config);
        Ok(Self { config, container })
    }

    pub fn container(&self) -> &RegionContainer {
        &self.container
    }

    /// Runs until SIGINT/SIGTERM, then shuts down gracefully.
    pub async fn run(self) -> anyhow::Result<()> {
        display_banner();

        let shutdown = ShutdownState::new();
        let signal_task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = setup_signal_handlers(&shutdown).await {
                    error!("❌ Failed to listen for shutdown signals: {}", e);
                    return;
                }

                // A second signal skips the graceful path
                if wait_for_signal().await.is_ok() {
                    warn!("Shutdown signal received again! Exiting without saving.");
                    std::process::exit(1);
                }
            })
        };

        let result = self.run_until_shutdown(shutdown).await;
        signal_task.abort();
        result
    }

    /// Runs until `shutdown` is initiated.
    pub async fn run_until_shutdown(self, shutdown: ShutdownState) -> anyhow::Result<()> {
        self.log_configuration_summary();

        self.load_worlds().await;

        let saver = self.container.spawn_background_saver(shutdown.clone());
        let loader = self.container.spawn_background_loader(shutdown.clone());

        info!("✅ RegionGuard is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        shutdown.wait().await;
        info!("🛑 Shutdown signal received, beginning graceful shutdown...");

        for (name, task) in [("saver", saver), ("loader", loader)] {
            let abort = task.abort_handle();
            if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
                warn!("⏰ Background {} did not stop in time, aborting it", name);
                abort.abort();
            }
        }

        info!("💾 Saving and unloading all worlds...");
        self.container.unload_all().await;

        info!("✅ RegionGuard shutdown complete");
        Ok(())
    }

    /// Loads every configured world concurrently. Failures are retried by
    /// the background loader.
    async fn load_worlds(&self) {
        let names = &self.config.worlds.names;
        let outcomes = futures::future::join_all(names.iter().map(|name| self.container.load(name))).await;

        for (name, outcome) in names.iter().zip(outcomes) {
            match outcome {
                OpOutcome::Completed => {}
                OpOutcome::Failed(e) => {
                    warn!(world = %name, "⚠️ World failed to load and will be retried: {}", e)
                }
                OpOutcome::Voided => warn!(world = %name, "⚠️ Initial load was superseded"),
            }
        }

        info!(
            "🌍 {} of {} world(s) loaded",
            self.container.loaded_worlds().len(),
            names.len()
        );
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  📂 Data directory: {}", self.config.storage.data_dir);
        info!("  🗂️ Index: {}", self.config.index.kind);
        info!("  🌍 Worlds: {}", self.config.worlds.names.join(", "));
        info!(
            "  ⏱️ Save every {}s, retry failed loads every {}s",
            self.config.storage.save_interval_secs, self.config.storage.load_retry_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_core::flags::defaults::PVP;
    use region_core::{BlockVector3, Geometry, Region, StateValue};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.data_dir = dir.path().to_string_lossy().to_string();
        config.worlds.names = vec!["overworld".to_string(), "nether".to_string()];
        config
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.index.kind = "octree".to_string();
        assert!(Application::new(config).is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_saves_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let app = Application::new(config(&dir)).unwrap();
        let container = app.container().clone();
        let shutdown = ShutdownState::new();

        let running = tokio::spawn(app.run_until_shutdown(shutdown.clone()));

        let manager = loop {
            if let Some(manager) = container.get("overworld") {
                break manager;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        let mut arena = Region::new(
            "arena",
            Geometry::cuboid(BlockVector3::new(0, 0, 0), BlockVector3::new(20, 64, 20)),
        )
        .unwrap();
        arena.set_flag(&PVP, Some(StateValue::Allow.into())).unwrap();
        manager.add_region(arena).await;

        shutdown.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(container.loaded_worlds().is_empty());
        assert!(dir.path().join("overworld.json").exists());
        assert!(!dir.path().join("nether.json").exists());

        // A fresh start sees the saved region
        let app = Application::new(config(&dir)).unwrap();
        let outcome = app.container().load("overworld").await;
        assert!(outcome.is_completed());
        let manager = app.container().get("overworld").unwrap();
        let pvp = manager
            .with_applicable(BlockVector3::new(5, 10, 5), |set| set.allows(&PVP, None))
            .await;
        assert!(pvp);
    }
}
