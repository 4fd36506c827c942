//! # Region Indexes
//!
//! A [`RegionIndex`] owns the authoritative [`RegionMap`] of a world and
//! answers spatial queries over it. Three implementations are provided and
//! are interchangeable:
//!
//! - [`FlatIndex`] - linear scan; the reference semantics
//! - [`RTreeIndex`] - bounding boxes in an `rstar` R*-tree
//! - [`ChunkIndex`] - per-chunk-column cache in front of another index
//!
//! Spatial queries never return the global region. Mutations take `&mut self`,
//! so a reader holding `&self` always sees a fully rebuilt structure.

mod chunk;
mod flat;
mod map;
mod rtree;


pub use chunk::ChunkIndex;
pub use flat::FlatIndex;
pub use map::{Ancestors, RegionMap};
pub use rtree::RTreeIndex;

use crate::error::RegionError;
use crate::geometry::Geometry;
use crate::region::{Region, GLOBAL_REGION};
use crate::types::{Actor, BlockVector3};
use std::collections::BTreeSet;

/// What happens to the children of a removed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalStrategy {
    /// Remove every descendant as well.
    #[default]
    RemoveChildren,
    /// Keep descendants and clear their link to the removed region.
    UnsetParentInChildren,
}

/// Regions changed or removed since changes were last taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Storage plus spatial lookup for the regions of one world.
pub trait RegionIndex: Send + Sync + std::fmt::Debug {
    fn map(&self) -> &RegionMap;

    /// Mutable access to the map for edits that do not move regions.
    fn map_mut(&mut self) -> &mut RegionMap;

    /// Inserts or replaces a region. Returns the replaced region.
    fn add(&mut self, region: Region) -> Option<Region>;

    /// Bulk insert; parent links are resolved once every region is present.
    fn add_all(&mut self, regions: Vec<Region>);

    /// Removes a region and, depending on `strategy`, its descendants.
    fn remove(&mut self, id: &str, strategy: RemovalStrategy) -> Vec<Region>;

    /// Regions whose geometry contains `point`, without ancestors.
    fn query_point(&self, point: BlockVector3) -> Vec<&Region>;

    /// Stored regions whose geometry intersects `geometry`.
    fn query_overlap(&self, geometry: &Geometry) -> Result<Vec<&Region>, RegionError>;

    fn get(&self, id: &str) -> Option<&Region> {
        self.map().get(id)
    }

    fn contains_id(&self, id: &str) -> bool {
        self.map().contains(id)
    }

    fn len(&self) -> usize {
        self.map().len()
    }

    fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.map_mut().get_mut(id)
    }

    fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<(), RegionError> {
        self.map_mut().set_parent(id, parent)
    }

    /// Prepares fast point lookups in chunk columns `(cx, cz)`, typically
    /// as the host loads them. Only caching indexes do anything here.
    fn bias_chunks(&self, _chunks: &[(i32, i32)]) {}

    /// Drops what [`RegionIndex::bias_chunks`] prepared for these columns.
    fn forget_chunks(&self, _chunks: &[(i32, i32)]) {}

    /// Columns currently biased, sorted.
    fn biased_chunks(&self) -> Vec<(i32, i32)> {
        Vec::new()
    }

    fn global_region(&self) -> Option<&Region> {
        self.map().get(GLOBAL_REGION)
    }

    /// Regions containing `point` plus all of their ancestors.
    fn applicable_point(&self, point: BlockVector3) -> Vec<&Region> {
        self.map().with_ancestors(self.query_point(point))
    }

    /// Stored regions overlapping `region`.
    ///
    /// # Errors
    ///
    /// [`RegionError::UnsupportedIntersection`] when `region` has no boundary.
    fn applicable_overlap(&self, region: &Region) -> Result<Vec<&Region>, RegionError> {
        self.query_overlap(region.geometry())
    }

    /// Number of regions listing `actor` as an owner. Members are not counted.
    fn region_count_owned_by(&self, actor: &Actor) -> usize {
        self.map().count_owned_by(actor)
    }

    fn is_dirty(&self) -> bool {
        self.map().is_dirty()
    }

    fn take_changes(&mut self) -> ChangeSet {
        self.map_mut().take_changes()
    }

    fn restore_changes(&mut self, changes: ChangeSet) {
        self.map_mut().restore_changes(changes)
    }
}

/// Which index implementation a world uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    Flat,
    #[default]
    RTree,
    Chunk,
}

impl IndexKind {
    /// Creates an empty index of this kind.
    pub fn create(self) -> Box<dyn RegionIndex> {
        match self {
            IndexKind::Flat => Box::new(FlatIndex::new()),
            IndexKind::RTree => Box::new(RTreeIndex::new()),
            IndexKind::Chunk => Box::new(ChunkIndex::new(RTreeIndex::new())),
        }
    }
}

impl std::str::FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(IndexKind::Flat),
            "rtree" | "r-tree" => Ok(IndexKind::RTree),
            "chunk" => Ok(IndexKind::Chunk),
            other => Err(format!("unknown index kind '{other}'")),
        }
    }
}

/// Error for a query shape that cannot be compared with anything.
pub(crate) fn require_bounded(geometry: &Geometry) -> Result<(), RegionError> {
    if geometry.is_physical() {
        Ok(())
    } else {
        Err(RegionError::UnsupportedIntersection(geometry.kind(), geometry.kind()))
    }
}
