use super::BoundingBox;
use crate::types::{BlockVector2, BlockVector3};

/// Axis-aligned box. `min` and `max` are inclusive and always normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cuboid {
    min: BlockVector3,
    max: BlockVector3,
}

impl Cuboid {
    pub fn new(a: BlockVector3, b: BlockVector3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> BlockVector3 {
        self.min
    }

    pub fn max(&self) -> BlockVector3 {
        self.max
    }

    pub fn contains(&self, p: BlockVector3) -> bool {
        self.bounding_box().contains(p)
    }

    pub(crate) fn contains_2d(&self, p: BlockVector2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min: self.min,
            max: self.max,
        }
    }

    /// Footprint corners, walking the rectangle in order.
    pub fn points(&self) -> [BlockVector2; 4] {
        [
            BlockVector2::new(self.min.x, self.min.z),
            BlockVector2::new(self.min.x, self.max.z),
            BlockVector2::new(self.max.x, self.max.z),
            BlockVector2::new(self.max.x, self.min.z),
        ]
    }

    /// Block count, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        let span = |a: i32, b: i32| (b as i64 - a as i64 + 1) as u64;
        span(self.min.x, self.max.x)
            .saturating_mul(span(self.min.y, self.max.y))
            .saturating_mul(span(self.min.z, self.max.z))
    }
}
