//! # Region Core
//!
//! Spatial protection regions and the engine that decides what is allowed
//! inside them.
//!
//! ## Core Features
//!
//! - **Regions**: cuboid, extruded polygon and world-wide shapes with
//!   priorities, parents, owners, members and typed flags
//! - **Indexes**: a flat reference scan, an R*-tree and a chunk-column cache,
//!   all answering the same queries identically
//! - **Resolution**: priority tiers, DENY dominance, inheritance through
//!   parents and role-group scoping of every flag value
//!
//! ## Quick Start Example
//!
//! ```rust
//! use region_core::*;
//! use region_core::flags::defaults::BUILD;
//!
//! # fn main() -> Result<(), RegionError> {
//! let alice = Actor::new(PlayerId::new());
//!
//! let mut keep = Region::new(
//!     "keep",
//!     Geometry::cuboid(BlockVector3::new(0, 0, 0), BlockVector3::new(31, 255, 31)),
//! )?;
//! keep.set_priority(10);
//! keep.set_flag(&BUILD, Some(StateValue::Deny.into()))?;
//! keep.owners_mut().add_player(alice.id);
//!
//! let mut index = RTreeIndex::new();
//! index.add(keep);
//!
//! let set = ApplicableSet::at_point(&index, BlockVector3::new(5, 64, 5));
//! assert!(set.can_build(&alice));
//! assert!(!set.can_build(&Actor::new(PlayerId::new())));
//! # Ok(())
//! # }
//! ```

pub mod applicable;
pub mod domain;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod index;
pub mod region;
pub mod resolver;
pub mod types;

pub use applicable::ApplicableSet;
pub use domain::Domain;
pub use error::RegionError;
pub use flags::{Association, Flag, FlagKind, FlagRegistry, FlagValue, RegionGroup, StateValue};
pub use geometry::{BoundingBox, Geometry, GeometryKind};
pub use index::{ChangeSet, ChunkIndex, FlatIndex, IndexKind, RTreeIndex, RegionIndex, RegionMap, RemovalStrategy};
pub use region::{Region, GLOBAL_REGION};
pub use resolver::{FlagResolver, MembershipResult};
pub use types::{normalize_id, Actor, BlockVector2, BlockVector3, PlayerId, Vec3};
