//! In-memory storage, mainly for tests.

use crate::database::{RegionDatabase, RegionDriver};
use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use region_core::{ChangeSet, FlagRegistry, Region};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Keeps the last saved snapshot in memory.
///
/// Loads and saves can be made to fail or to take a while, which lets tests
/// exercise retry and supersede paths without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    regions: Mutex<Vec<Region>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    delay_ms: AtomicU64,
    loads: AtomicUsize,
    saves: AtomicUsize,
    last_changes: Mutex<Option<ChangeSet>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A database that already holds `regions`.
    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self {
            regions: Mutex::new(regions),
            ..Self::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::Release);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Release);
    }

    /// Makes every load and save sleep for `delay` first.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::Release);
    }

    /// Number of load calls that reached the store.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    /// Number of save calls that reached the store.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }

    /// Copy of the stored snapshot.
    pub async fn snapshot(&self) -> Vec<Region> {
        self.regions.lock().await.clone()
    }

    /// The change set passed to the most recent partial save.
    pub async fn last_changes(&self) -> Option<ChangeSet> {
        self.last_changes.lock().await.clone()
    }

    async fn pause(&self) {
        let ms = self.delay_ms.load(Ordering::Acquire);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl RegionDatabase for MemoryDatabase {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, _registry: &FlagRegistry) -> Result<Vec<Region>, StorageError> {
        self.loads.fetch_add(1, Ordering::AcqRel);
        self.pause().await;
        if self.fail_loads.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable("memory store is failing loads".to_string()));
        }
        let mut regions = self.regions.lock().await.clone();
        for region in &mut regions {
            region.set_dirty(false);
        }
        Ok(regions)
    }

    async fn save_all(&self, regions: &[Region]) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::AcqRel);
        self.pause().await;
        if self.fail_saves.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable("memory store is failing saves".to_string()));
        }
        *self.regions.lock().await = regions.to_vec();
        Ok(())
    }

    async fn save_changes(&self, regions: &[Region], changes: &ChangeSet) -> Result<(), StorageError> {
        self.save_all(regions).await?;
        *self.last_changes.lock().await = Some(changes.clone());
        Ok(())
    }
}

/// Hands out one [`MemoryDatabase`] per world, created on first use.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    worlds: DashMap<String, Arc<MemoryDatabase>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The database backing `world`, for seeding or failure injection.
    pub fn world(&self, world: &str) -> Arc<MemoryDatabase> {
        self.worlds
            .entry(region_core::normalize_id(world))
            .or_insert_with(|| Arc::new(MemoryDatabase::new()))
            .clone()
    }
}

impl RegionDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    fn database(&self, world: &str) -> Arc<dyn RegionDatabase> {
        self.world(world)
    }
}
