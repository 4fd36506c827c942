//! Chunk-column cache in front of another index.
//!
//! Hosts "bias" the chunk columns they expect queries in (typically loaded
//! chunks). For a biased column the ids of every region whose bounding box
//! touches it are cached, so a point query only tests those regions. Queries
//! in other columns go to the wrapped index. Any add or remove recomputes
//! every cached column before the mutation returns.

use super::{RegionIndex, RegionMap, RemovalStrategy};
use crate::error::RegionError;
use crate::geometry::Geometry;
use crate::region::Region;
use crate::types::BlockVector3;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

type ChunkKey = (i32, i32);

#[derive(Debug)]
pub struct ChunkIndex<I> {
    inner: I,
    cache: DashMap<ChunkKey, Arc<Vec<String>>>,
}

impl<I: RegionIndex> ChunkIndex<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    fn compute(&self, chunk: ChunkKey) -> Arc<Vec<String>> {
        let mut ids: Vec<String> = self
            .inner
            .map()
            .iter()
            .filter(|r| {
                r.geometry()
                    .bounding_box()
                    .is_some_and(|b| b.overlaps_chunk(chunk))
            })
            .map(|r| r.id().to_string())
            .collect();
        ids.sort();
        Arc::new(ids)
    }

    /// Caches the regions touching chunk column `(cx, cz)`.
    pub fn bias(&self, cx: i32, cz: i32) {
        let state = self.compute((cx, cz));
        self.cache.insert((cx, cz), state);
    }

    pub fn bias_all(&self, chunks: impl IntoIterator<Item = (i32, i32)>) {
        for (cx, cz) in chunks {
            self.bias(cx, cz);
        }
    }

    pub fn forget(&self, cx: i32, cz: i32) {
        self.cache.remove(&(cx, cz));
    }

    pub fn forget_all(&self) {
        self.cache.clear();
    }

    pub fn is_biased(&self, cx: i32, cz: i32) -> bool {
        self.cache.contains_key(&(cx, cz))
    }

    pub fn cached_chunks(&self) -> usize {
        self.cache.len()
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    fn rebuild(&self) {
        let keys: Vec<ChunkKey> = self.cache.iter().map(|e| *e.key()).collect();
        for key in &keys {
            let state = self.compute(*key);
            self.cache.insert(*key, state);
        }
        debug!(chunks = keys.len(), "Recomputed cached chunk columns");
    }
}

impl<I: RegionIndex> RegionIndex for ChunkIndex<I> {
    fn map(&self) -> &RegionMap {
        self.inner.map()
    }

    fn map_mut(&mut self) -> &mut RegionMap {
        self.inner.map_mut()
    }

    fn add(&mut self, region: Region) -> Option<Region> {
        let previous = self.inner.add(region);
        self.rebuild();
        previous
    }

    fn add_all(&mut self, regions: Vec<Region>) {
        self.inner.add_all(regions);
        self.rebuild();
    }

    fn remove(&mut self, id: &str, strategy: RemovalStrategy) -> Vec<Region> {
        let removed = self.inner.remove(id, strategy);
        if !removed.is_empty() {
            self.rebuild();
        }
        removed
    }

    fn query_point(&self, point: BlockVector3) -> Vec<&Region> {
        let cached = self.cache.get(&point.chunk()).map(|ids| Arc::clone(ids.value()));
        match cached {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.inner.map().get(id))
                .filter(|r| r.geometry().contains(point))
                .collect(),
            None => self.inner.query_point(point),
        }
    }

    fn query_overlap(&self, geometry: &Geometry) -> Result<Vec<&Region>, RegionError> {
        self.inner.query_overlap(geometry)
    }

    fn bias_chunks(&self, chunks: &[(i32, i32)]) {
        self.bias_all(chunks.iter().copied());
    }

    fn forget_chunks(&self, chunks: &[(i32, i32)]) {
        for &(cx, cz) in chunks {
            self.forget(cx, cz);
        }
    }

    fn biased_chunks(&self) -> Vec<(i32, i32)> {
        let mut keys: Vec<ChunkKey> = self.cache.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        keys
    }
}
