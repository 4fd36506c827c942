//! R*-tree backed region index.
//!
//! The tree holds one entry per bounded region, enveloped by its bounding
//! box. Queries use the tree as a broad phase and confirm every candidate
//! with the exact geometry test.

use super::{require_bounded, RegionIndex, RegionMap, RemovalStrategy};
use crate::error::RegionError;
use crate::geometry::{BoundingBox, Geometry};
use crate::region::Region;
use crate::types::BlockVector3;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;
use tracing::trace;

/// Entry stored inside the R-tree.
#[derive(Debug, Clone)]
struct RegionEntry {
    id: String,
    envelope: AABB<[f64; 3]>,
}

impl RegionEntry {
    fn new(id: &str, bounds: BoundingBox) -> Self {
        let (min, max) = bounds.to_envelope_corners();
        Self {
            id: id.to_string(),
            envelope: AABB::from_corners(min, max),
        }
    }
}

impl PartialEq for RegionEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn point_envelope(p: BlockVector3) -> AABB<[f64; 3]> {
    AABB::from_point([p.x as f64, p.y as f64, p.z as f64])
}

/// Region index backed by an R*-tree of bounding boxes.
#[derive(Debug)]
pub struct RTreeIndex {
    regions: RegionMap,
    tree: RTree<RegionEntry>,
    /// Cached entries for removal by id
    entries: HashMap<String, RegionEntry>,
}

impl Default for RTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RTreeIndex {
    pub fn new() -> Self {
        Self {
            regions: RegionMap::new(),
            tree: RTree::new(),
            entries: HashMap::new(),
        }
    }

    fn unlink(&mut self, id: &str) {
        if let Some(existing) = self.entries.remove(id) {
            let _ = self.tree.remove(&existing);
        }
    }

    fn link(&mut self, region: &Region) {
        if let Some(bounds) = region.geometry().bounding_box() {
            let entry = RegionEntry::new(region.id(), bounds);
            self.tree.insert(entry.clone());
            self.entries.insert(entry.id.clone(), entry);
        }
    }

    /// Rebuilds the tree from the authoritative map with bulk loading.
    fn rebuild(&mut self) {
        self.entries = self
            .regions
            .iter()
            .filter_map(|r| {
                r.geometry()
                    .bounding_box()
                    .map(|b| (r.id().to_string(), RegionEntry::new(r.id(), b)))
            })
            .collect();
        self.tree = RTree::bulk_load(self.entries.values().cloned().collect());
        trace!(entries = self.entries.len(), "Rebuilt region R-tree");
    }
}

impl RegionIndex for RTreeIndex {
    fn map(&self) -> &RegionMap {
        &self.regions
    }

    fn map_mut(&mut self) -> &mut RegionMap {
        &mut self.regions
    }

    fn add(&mut self, region: Region) -> Option<Region> {
        self.unlink(region.id());
        self.link(&region);
        self.regions.insert(region)
    }

    fn add_all(&mut self, regions: Vec<Region>) {
        self.regions.insert_all(regions);
        self.rebuild();
    }

    fn remove(&mut self, id: &str, strategy: RemovalStrategy) -> Vec<Region> {
        let removed = self.regions.remove(id, strategy);
        for region in &removed {
            self.unlink(region.id());
        }
        removed
    }

    fn query_point(&self, point: BlockVector3) -> Vec<&Region> {
        self.tree
            .locate_in_envelope_intersecting(&point_envelope(point))
            .filter_map(|entry| self.regions.get(&entry.id))
            .filter(|r| r.geometry().contains(point))
            .collect()
    }

    fn query_overlap(&self, geometry: &Geometry) -> Result<Vec<&Region>, RegionError> {
        require_bounded(geometry)?;
        let Some(bounds) = geometry.bounding_box() else {
            return Ok(Vec::new());
        };
        let (min, max) = bounds.to_envelope_corners();
        let envelope = AABB::from_corners(min, max);

        let mut out = Vec::new();
        for entry in self.tree.locate_in_envelope_intersecting(&envelope) {
            if let Some(region) = self.regions.get(&entry.id) {
                if geometry.intersects(region.geometry())? {
                    out.push(region);
                }
            }
        }
        Ok(out)
    }
}
