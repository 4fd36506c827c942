//! # Region Geometry
//!
//! Geometry is a closed set of shapes: an axis-aligned [`Cuboid`], a
//! vertically extruded [`Polygon`], and the boundary-less global shape that
//! contains every point.
//!
//! Every bounded shape exposes an exact containment test and an inclusive
//! [`BoundingBox`] used for broad-phase filtering by the indexes.

mod bounds;
mod cuboid;
mod polygon;

pub use bounds::BoundingBox;
pub use cuboid::Cuboid;
pub use polygon::Polygon;

use crate::error::RegionError;
use crate::types::{BlockVector2, BlockVector3};
use serde::{Deserialize, Serialize};

/// Discriminant of a [`Geometry`], used in error reports and persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Cuboid,
    Polygon,
    Global,
}

/// The boundary of a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Geometry {
    Cuboid(Cuboid),
    Polygon(Polygon),
    /// Matches everywhere; never returned from spatial queries.
    Global,
}

impl Geometry {
    /// Creates a cuboid from two opposite corners given in any order.
    pub fn cuboid(a: BlockVector3, b: BlockVector3) -> Self {
        Geometry::Cuboid(Cuboid::new(a, b))
    }

    /// Creates an extruded polygon.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidGeometry`] when fewer than three vertices
    /// are supplied.
    pub fn polygon(points: Vec<BlockVector2>, min_y: i32, max_y: i32) -> Result<Self, RegionError> {
        Polygon::new(points, min_y, max_y).map(Geometry::Polygon)
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Cuboid(_) => GeometryKind::Cuboid,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::Global => GeometryKind::Global,
        }
    }

    /// Whether this shape occupies a bounded area of the world.
    pub fn is_physical(&self) -> bool {
        !matches!(self, Geometry::Global)
    }

    /// Exact containment test.
    pub fn contains(&self, point: BlockVector3) -> bool {
        match self {
            Geometry::Cuboid(c) => c.contains(point),
            Geometry::Polygon(p) => p.contains(point),
            Geometry::Global => true,
        }
    }

    /// Containment on the x/z plane only.
    pub(crate) fn contains_2d(&self, point: BlockVector2) -> bool {
        match self {
            Geometry::Cuboid(c) => c.contains_2d(point),
            Geometry::Polygon(p) => p.contains_2d(point),
            Geometry::Global => true,
        }
    }

    /// Broad-phase box. `None` for the global shape.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Geometry::Cuboid(c) => Some(c.bounding_box()),
            Geometry::Polygon(p) => Some(p.bounding_box()),
            Geometry::Global => None,
        }
    }

    /// Footprint vertices in order.
    pub fn points(&self) -> Vec<BlockVector2> {
        match self {
            Geometry::Cuboid(c) => c.points().to_vec(),
            Geometry::Polygon(p) => p.points().to_vec(),
            Geometry::Global => Vec::new(),
        }
    }

    /// Number of blocks enclosed. Zero for the global shape.
    pub fn volume(&self) -> u64 {
        match self {
            Geometry::Cuboid(c) => c.volume(),
            Geometry::Polygon(p) => p.volume(),
            Geometry::Global => 0,
        }
    }

    /// Tests whether two shapes overlap.
    ///
    /// Bounding boxes are compared first. Two cuboids are decided by that test
    /// alone; when a polygon is involved the footprints must also share a
    /// vertex-in-shape or an edge crossing.
    ///
    /// # Errors
    ///
    /// [`RegionError::UnsupportedIntersection`] when either side is the global
    /// shape, which has no boundary to compare.
    pub fn intersects(&self, other: &Geometry) -> Result<bool, RegionError> {
        let (Some(a), Some(b)) = (self.bounding_box(), other.bounding_box()) else {
            return Err(RegionError::UnsupportedIntersection(self.kind(), other.kind()));
        };
        if !a.intersects(&b) {
            return Ok(false);
        }
        if let (Geometry::Cuboid(_), Geometry::Cuboid(_)) = (self, other) {
            return Ok(true);
        }

        let ours = self.points();
        let theirs = other.points();
        Ok(theirs.iter().any(|p| self.contains_2d(*p))
            || ours.iter().any(|p| other.contains_2d(*p))
            || polygon::edges_intersect(&ours, &theirs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: i32, y: i32, z: i32) -> BlockVector3 {
        BlockVector3::new(x, y, z)
    }

    fn v2(x: i32, z: i32) -> BlockVector2 {
        BlockVector2::new(x, z)
    }

    #[test]
    fn test_cuboid_normalizes_corners() {
        let geometry = Geometry::cuboid(v(10, 80, -5), v(-10, 0, 5));
        let bounds = geometry.bounding_box().unwrap();
        assert_eq!(bounds.min, v(-10, 0, -5));
        assert_eq!(bounds.max, v(10, 80, 5));
        assert!(geometry.contains(v(10, 80, 5)));
        assert!(geometry.contains(v(-10, 0, -5)));
        assert!(!geometry.contains(v(11, 0, 0)));
        assert_eq!(geometry.volume(), 21 * 81 * 11);
    }

    #[test]
    fn test_world_sized_cuboid_volume_saturates() {
        let world = Geometry::cuboid(v(i32::MIN, i32::MIN, i32::MIN), v(i32::MAX, i32::MAX, i32::MAX));
        assert_eq!(world.volume(), u64::MAX);
        assert!(world.contains(v(0, 0, 0)));
    }

    #[test]
    fn test_global_contains_everything_but_cannot_intersect() {
        let global = Geometry::Global;
        assert!(global.contains(v(i32::MAX, i32::MIN, 0)));
        assert!(global.bounding_box().is_none());

        let cuboid = Geometry::cuboid(v(0, 0, 0), v(1, 1, 1));
        assert_eq!(
            cuboid.intersects(&global),
            Err(RegionError::UnsupportedIntersection(GeometryKind::Cuboid, GeometryKind::Global))
        );
    }

    #[test]
    fn test_cuboid_intersection_is_inclusive() {
        let a = Geometry::cuboid(v(0, 0, 0), v(10, 10, 10));
        let touching = Geometry::cuboid(v(10, 10, 10), v(20, 20, 20));
        let apart = Geometry::cuboid(v(11, 0, 0), v(20, 10, 10));
        let above = Geometry::cuboid(v(0, 11, 0), v(10, 20, 10));

        assert_eq!(a.intersects(&touching), Ok(true));
        assert_eq!(a.intersects(&apart), Ok(false));
        assert_eq!(a.intersects(&above), Ok(false));
    }

    #[test]
    fn test_polygon_and_cuboid_crossing_without_contained_vertices() {
        // A thin horizontal bar crossing a thin vertical bar: no vertex of
        // either lies inside the other, only the edges cross.
        let bar = Geometry::polygon(vec![v2(-10, -1), v2(10, -1), v2(10, 1), v2(-10, 1)], 0, 10).unwrap();
        let post = Geometry::cuboid(v(-1, 0, -10), v(1, 10, 10));
        assert_eq!(bar.intersects(&post), Ok(true));
        assert_eq!(post.intersects(&bar), Ok(true));
    }

    #[test]
    fn test_polygon_boxes_overlap_but_shapes_do_not() {
        // Triangle in the lower-left half of its box; cuboid tucked into the
        // upper-right corner of the same box.
        let triangle = Geometry::polygon(vec![v2(0, 0), v2(20, 0), v2(0, 20)], 0, 10).unwrap();
        let corner = Geometry::cuboid(v(15, 0, 15), v(20, 10, 20));
        assert_eq!(triangle.intersects(&corner), Ok(false));
        assert_eq!(corner.intersects(&triangle), Ok(false));
    }
}
