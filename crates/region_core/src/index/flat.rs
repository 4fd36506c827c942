use super::{require_bounded, RegionIndex, RegionMap, RemovalStrategy};
use crate::error::RegionError;
use crate::geometry::Geometry;
use crate::region::Region;
use crate::types::BlockVector3;

/// Linear-scan index. Every query tests every region.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    regions: RegionMap,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionIndex for FlatIndex {
    fn map(&self) -> &RegionMap {
        &self.regions
    }

    fn map_mut(&mut self) -> &mut RegionMap {
        &mut self.regions
    }

    fn add(&mut self, region: Region) -> Option<Region> {
        self.regions.insert(region)
    }

    fn add_all(&mut self, regions: Vec<Region>) {
        self.regions.insert_all(regions);
    }

    fn remove(&mut self, id: &str, strategy: RemovalStrategy) -> Vec<Region> {
        self.regions.remove(id, strategy)
    }

    fn query_point(&self, point: BlockVector3) -> Vec<&Region> {
        self.regions
            .iter()
            .filter(|r| r.geometry().is_physical() && r.geometry().contains(point))
            .collect()
    }

    fn query_overlap(&self, geometry: &Geometry) -> Result<Vec<&Region>, RegionError> {
        require_bounded(geometry)?;
        let mut out = Vec::new();
        for region in self.regions.iter().filter(|r| r.geometry().is_physical()) {
            if geometry.intersects(region.geometry())? {
                out.push(region);
            }
        }
        Ok(out)
    }
}
