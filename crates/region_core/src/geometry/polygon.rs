use super::BoundingBox;
use crate::error::RegionError;
use crate::types::{BlockVector2, BlockVector3};

/// A 2D footprint extruded between two inclusive elevations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<BlockVector2>,
    min_y: i32,
    max_y: i32,
    bounds: BoundingBox,
}

impl Polygon {
    pub fn new(points: Vec<BlockVector2>, min_y: i32, max_y: i32) -> Result<Self, RegionError> {
        if points.len() < 3 {
            return Err(RegionError::InvalidGeometry(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        let (min_y, max_y) = (min_y.min(max_y), min_y.max(max_y));

        let mut min = BlockVector3::new(points[0].x, min_y, points[0].z);
        let mut max = BlockVector3::new(points[0].x, max_y, points[0].z);
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.z = max.z.max(p.z);
        }

        Ok(Self {
            points,
            min_y,
            max_y,
            bounds: BoundingBox { min, max },
        })
    }

    pub fn points(&self) -> &[BlockVector2] {
        &self.points
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    pub fn contains(&self, p: BlockVector3) -> bool {
        if p.y < self.min_y || p.y > self.max_y {
            return false;
        }
        self.contains_2d(p.to_2d())
    }

    /// Crossing-number test. Points on a vertex or an edge are inside.
    ///
    /// Products of two coordinate spans need 65 bits, so the arithmetic is
    /// done in `i128`.
    pub(crate) fn contains_2d(&self, target: BlockVector2) -> bool {
        let b = &self.bounds;
        if target.x < b.min.x || target.x > b.max.x || target.z < b.min.z || target.z > b.max.z {
            return false;
        }

        let (tx, tz) = (target.x as i128, target.z as i128);
        let mut inside = false;
        let last = self.points[self.points.len() - 1];
        let (mut x_old, mut z_old) = (last.x as i128, last.z as i128);

        for p in &self.points {
            let (x_new, z_new) = (p.x as i128, p.z as i128);
            if x_new == tx && z_new == tz {
                return true;
            }

            let (x1, z1, x2, z2) = if x_new > x_old {
                (x_old, z_old, x_new, z_new)
            } else {
                (x_new, z_new, x_old, z_old)
            };

            if x1 <= tx && tx <= x2 {
                let cross = (tz - z1) * (x2 - x1) - (z2 - z1) * (tx - x1);
                if cross == 0 {
                    if (z1 <= tz) == (tz <= z2) {
                        return true;
                    }
                } else if cross < 0 && x1 != tx {
                    inside = !inside;
                }
            }

            x_old = x_new;
            z_old = z_new;
        }

        inside
    }

    /// Footprint area (shoelace) times height, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        let n = self.points.len();
        let mut twice_area: i128 = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += a.x as i128 * b.z as i128 - b.x as i128 * a.z as i128;
        }
        let height = (self.max_y as i128 - self.min_y as i128 + 1) as u128;
        let volume = (twice_area.unsigned_abs() / 2).saturating_mul(height);
        u64::try_from(volume).unwrap_or(u64::MAX)
    }
}

fn orientation(a: BlockVector2, b: BlockVector2, c: BlockVector2) -> i32 {
    let v = (b.x as i128 - a.x as i128) * (c.z as i128 - a.z as i128)
        - (b.z as i128 - a.z as i128) * (c.x as i128 - a.x as i128);
    v.signum() as i32
}

fn on_segment(a: BlockVector2, b: BlockVector2, p: BlockVector2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.z >= a.z.min(b.z) && p.z <= a.z.max(b.z)
}

/// Closed segment intersection, collinear overlap and touching included.
fn segments_intersect(p1: BlockVector2, p2: BlockVector2, p3: BlockVector2, p4: BlockVector2) -> bool {
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }

    (d1 == 0 && on_segment(p3, p4, p1))
        || (d2 == 0 && on_segment(p3, p4, p2))
        || (d3 == 0 && on_segment(p1, p2, p3))
        || (d4 == 0 && on_segment(p1, p2, p4))
}

/// Whether any edge of one closed outline crosses any edge of the other.
pub(super) fn edges_intersect(a: &[BlockVector2], b: &[BlockVector2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    for i in 0..a.len() {
        let (a1, a2) = (a[i], a[(i + 1) % a.len()]);
        for j in 0..b.len() {
            let (b1, b2) = (b[j], b[(j + 1) % b.len()]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}
