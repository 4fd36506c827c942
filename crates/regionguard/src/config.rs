//! Configuration management for the region daemon.
//!
//! This module handles loading, validation, and conversion of configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use region_core::IndexKind;
use region_store::ContainerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Log levels accepted on their own; anything with `=` is passed to the
/// filter as a directive list.
const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_save_interval() -> u64 {
    30
}

fn default_load_retry() -> u64 {
    30
}

fn default_index_kind() -> String {
    "rtree".to_string()
}

fn default_worlds() -> Vec<String> {
    vec!["world".to_string()]
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how often region data is persisted
    pub storage: StorageSettings,
    /// Index implementation used for every world
    #[serde(default)]
    pub index: IndexSettings,
    /// Worlds loaded at startup
    #[serde(default)]
    pub worlds: WorldSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding one `<world>.json` file per world
    pub data_dir: String,
    /// Seconds between background saves of changed worlds
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
    /// Seconds between retries of worlds that failed to load
    #[serde(default = "default_load_retry")]
    pub load_retry_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// `flat`, `rtree` or `chunk`
    #[serde(default = "default_index_kind")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_worlds")]
    pub names: Vec<String>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error) or filter directives
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            kind: default_index_kind(),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            names: default_worlds(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                data_dir: "regions".to_string(),
                save_interval_secs: default_save_interval(),
                load_retry_secs: default_load_retry(),
            },
            index: IndexSettings::default(),
            worlds: WorldSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and
    /// returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(data_dir) = &args.data_dir {
            self.storage.data_dir = data_dir.to_string_lossy().to_string();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(index) = &args.index {
            self.index.kind = index.clone();
        }
        if !args.worlds.is_empty() {
            self.worlds.names = args.worlds.clone();
        }
    }

    pub fn index_kind(&self) -> Result<IndexKind, String> {
        self.index.kind.parse()
    }

    /// Settings for the world container.
    pub fn to_container_config(&self) -> Result<ContainerConfig, String> {
        Ok(ContainerConfig {
            index_kind: self.index_kind()?,
            save_interval: Duration::from_secs(self.storage.save_interval_secs),
            load_retry_interval: Duration::from_secs(self.storage.load_retry_secs),
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.data_dir.trim().is_empty() {
            return Err("Storage data_dir cannot be empty".to_string());
        }

        if self.storage.save_interval_secs == 0 {
            return Err("storage.save_interval_secs must be greater than 0".to_string());
        }

        if self.storage.load_retry_secs == 0 {
            return Err("storage.load_retry_secs must be greater than 0".to_string());
        }

        self.index_kind()?;

        if self.worlds.names.iter().any(|w| w.trim().is_empty()) {
            return Err("World names cannot be empty".to_string());
        }

        let level = self.logging.level.trim();
        if level.is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        if !level.contains('=') && !VALID_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.storage.data_dir, "regions");
        assert_eq!(config.storage.save_interval_secs, 30);
        assert_eq!(config.storage.load_retry_secs, 30);
        assert_eq!(config.index.kind, "rtree");
        assert_eq!(config.worlds.names, vec!["world".to_string()]);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.logging.file_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.storage.save_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.load_retry_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.data_dir = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.index.kind = "octree".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "info,region_store=debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_container_config_conversion() {
        let mut config = AppConfig::default();
        config.index.kind = "chunk".to_string();
        config.storage.save_interval_secs = 5;

        let container = config.to_container_config().unwrap();
        assert_eq!(container.index_kind, IndexKind::Chunk);
        assert_eq!(container.save_interval, Duration::from_secs(5));
        assert_eq!(container.load_retry_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: PathBuf::from("config.toml"),
            data_dir: Some(PathBuf::from("/srv/regions")),
            log_level: Some("debug".to_string()),
            json_logs: true,
            index: Some("flat".to_string()),
            worlds: vec!["overworld".to_string(), "nether".to_string()],
        };
        config.apply_cli(&args);

        assert_eq!(config.storage.data_dir, "/srv/regions");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.index.kind, "flat");
        assert_eq!(config.worlds.names.len(), 2);

        // No overrides leaves the values alone
        config.apply_cli(&CliArgs::default());
        assert_eq!(config.index.kind, "flat");
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.storage.data_dir, "regions");
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.worlds.names, config.worlds.names);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[storage]
data_dir = "/var/lib/regions"
save_interval_secs = 10

[index]
kind = "flat"

[worlds]
names = ["overworld", "nether", "end"]

[logging]
level = "warn"
json_format = true
file_path = "/var/log/regionguard.log"
"#;
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.storage.data_dir, "/var/lib/regions");
        assert_eq!(config.storage.save_interval_secs, 10);
        assert_eq!(config.storage.load_retry_secs, 30);
        assert_eq!(config.index_kind().unwrap(), IndexKind::Flat);
        assert_eq!(config.worlds.names.len(), 3);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.file_path.as_deref(), Some("/var/log/regionguard.log"));
    }

    #[tokio::test]
    async fn test_load_minimal_file_uses_defaults() {
        let toml_content = r#"
[storage]
data_dir = "data"

[logging]
level = "info"
json_format = false
"#;
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.index.kind, "rtree");
        assert_eq!(config.worlds.names, vec!["world".to_string()]);
        assert!(config.logging.file_path.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_toml() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "storage = [not toml").await.unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }
}
