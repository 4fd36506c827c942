use crate::types::BlockVector3;

/// Inclusive axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub min: BlockVector3,
    pub max: BlockVector3,
}

impl BoundingBox {
    /// Builds a box from two corners in any order.
    pub fn new(a: BlockVector3, b: BlockVector3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, p: BlockVector3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Whether the box overlaps the 16x16 column `(cx, cz)` at any height.
    pub fn overlaps_chunk(&self, (cx, cz): (i32, i32)) -> bool {
        let (min_cx, min_cz) = self.min.chunk();
        let (max_cx, max_cz) = self.max.chunk();
        cx >= min_cx && cx <= max_cx && cz >= min_cz && cz <= max_cz
    }

    /// Corners as `f64` arrays, the envelope form the R-tree expects.
    pub fn to_envelope_corners(&self) -> ([f64; 3], [f64; 3]) {
        (
            [self.min.x as f64, self.min.y as f64, self.min.z as f64],
            [self.max.x as f64, self.max.y as f64, self.max.z as f64],
        )
    }
}
