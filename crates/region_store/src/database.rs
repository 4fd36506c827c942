//! Interfaces between the region engine and its backing stores.

use crate::error::StorageError;
use async_trait::async_trait;
use region_core::{ChangeSet, FlagRegistry, Region};
use std::sync::Arc;

/// Backing store for the regions of a single world.
///
/// Implementations only move data; parent links, dirty flags and spatial
/// indexing are the caller's concern.
#[async_trait]
pub trait RegionDatabase: Send + Sync + std::fmt::Debug {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Reads every stored region.
    ///
    /// Flag values are decoded through `registry`. Fields that cannot be
    /// decoded are dropped with a warning rather than failing the load.
    async fn load(&self, registry: &FlagRegistry) -> Result<Vec<Region>, StorageError>;

    /// Replaces the stored contents with `regions`.
    async fn save_all(&self, regions: &[Region]) -> Result<(), StorageError>;

    /// Persists only what changed. `regions` is the full current set.
    ///
    /// Stores that cannot write partially fall back to a full save.
    async fn save_changes(&self, regions: &[Region], changes: &ChangeSet) -> Result<(), StorageError> {
        let _ = changes;
        self.save_all(regions).await
    }
}

/// Hands out the database for each world.
pub trait RegionDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Database for the world with the normalized name `world`.
    fn database(&self, world: &str) -> Arc<dyn RegionDatabase>;
}
