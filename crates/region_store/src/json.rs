//! JSON file storage: one document per world.

use crate::database::{RegionDatabase, RegionDriver};
use crate::error::StorageError;
use crate::record;
use async_trait::async_trait;
use region_core::{FlagRegistry, Region};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Regions of one world stored in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDatabase {
    path: PathBuf,
    name: String,
}

impl JsonFileDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut file_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

#[async_trait]
impl RegionDatabase for JsonFileDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, registry: &FlagRegistry) -> Result<Vec<Region>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No region file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let document = record::parse_document(&raw)?;
        let regions = record::decode(document, registry);
        debug!(path = %self.path.display(), count = regions.len(), "Read region file");
        Ok(regions)
    }

    async fn save_all(&self, regions: &[Region]) -> Result<(), StorageError> {
        let document = record::encode(regions)?;
        let content = serde_json::to_string_pretty(&document)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), count = regions.len(), "Wrote region file");
        Ok(())
    }
}

/// Places each world's file under a data directory as `<world>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileDriver {
    data_dir: PathBuf,
}

impl JsonFileDriver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        info!("📂 Region data directory: {}", data_dir.display());
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl RegionDriver for JsonFileDriver {
    fn name(&self) -> &str {
        "json"
    }

    fn database(&self, world: &str) -> Arc<dyn RegionDatabase> {
        Arc::new(JsonFileDatabase::new(self.data_dir.join(format!("{world}.json"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_core::flags::defaults::PVP;
    use region_core::{BlockVector3, FlagValue, Geometry, StateValue};
    use tempfile::TempDir;

    fn region(id: &str) -> Region {
        Region::new(id, Geometry::cuboid(BlockVector3::new(0, 0, 0), BlockVector3::new(10, 10, 10))).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let db = JsonFileDatabase::new(dir.path().join("world.json"));
        let loaded = db.load(&FlagRegistry::with_defaults()).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let db = JsonFileDatabase::new(dir.path().join("nested").join("world.json"));

        let mut arena = region("arena");
        arena.set_flag(&PVP, Some(StateValue::Allow.into())).unwrap();
        db.save_all(&[arena, region("lobby")]).await.unwrap();

        assert!(db.path().exists());
        assert!(!db.temp_path().exists());

        let mut loaded = db.load(&FlagRegistry::with_defaults()).await.unwrap();
        loaded.sort_by(|a, b| a.id().cmp(b.id()));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), "arena");
        assert_eq!(loaded[0].flag(&PVP), Some(&FlagValue::State(StateValue::Allow)));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let db = JsonFileDatabase::new(dir.path().join("world.json"));
        db.save_all(&[region("a"), region("b")]).await.unwrap();
        db.save_all(&[region("c")]).await.unwrap();

        let loaded = db.load(&FlagRegistry::with_defaults()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), "c");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("world.json");
        tokio::fs::write(&path, "this is not json").await.unwrap();

        let db = JsonFileDatabase::new(&path);
        let result = db.load(&FlagRegistry::with_defaults()).await;
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[test]
    fn test_driver_paths() {
        let driver = JsonFileDriver::new("/srv/regions");
        let db = driver.database("overworld");
        assert_eq!(db.name(), "json:/srv/regions/overworld.json");
    }
}
