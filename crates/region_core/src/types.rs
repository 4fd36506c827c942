//! # Core Type Definitions
//!
//! Fundamental value types shared by the region engine: player identities,
//! block coordinates, floating point vectors used by vector-typed flags, and
//! the [`Actor`] a query is evaluated for.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Unique identifier for a player
//! - [`BlockVector3`] - Integer block coordinate
//! - [`BlockVector2`] - Integer footprint coordinate (x/z plane)
//! - [`Vec3`] - Double precision vector
//! - [`Actor`] - A player plus the permission groups they belong to

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a player.
///
/// A wrapper around UUID so player ids cannot be confused with region ids
/// or group names.
///
/// # Examples
///
/// ```rust
/// use region_core::PlayerId;
///
/// let player_id = PlayerId::from_str("550e8400-e29b-41d4-a716-446655440000")?;
/// println!("Player ID: {}", player_id);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a player ID from a string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - A string slice containing a valid UUID
    ///
    /// # Returns
    ///
    /// Returns `Ok(PlayerId)` if the string is a valid UUID, otherwise returns
    /// `Err(uuid::Error)` with details about the parsing failure.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer block coordinate in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockVector3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockVector3 {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Componentwise minimum of two vectors.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Componentwise maximum of two vectors.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Drops the y axis.
    pub fn to_2d(self) -> BlockVector2 {
        BlockVector2::new(self.x, self.z)
    }

    /// Chunk column this block lies in (16x16 columns).
    pub fn chunk(self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }
}

impl std::fmt::Display for BlockVector3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Integer coordinate on the horizontal (x/z) plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockVector2 {
    pub x: i32,
    pub z: i32,
}

impl BlockVector2 {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// 3D vector with double precision, used for vector-valued flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Calculates the Euclidean distance to another vector.
    pub fn distance(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<BlockVector3> for Vec3 {
    fn from(v: BlockVector3) -> Self {
        Self::new(v.x as f64, v.y as f64, v.z as f64)
    }
}

/// The subject a protection query is evaluated for.
///
/// Group names are stored lowercase so they compare the same way domain
/// group entries do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: PlayerId,
    groups: BTreeSet<String>,
}

impl Actor {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            groups: BTreeSet::new(),
        }
    }

    /// Builder-style helper adding a permission group.
    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.insert(group.to_lowercase());
        self
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(&group.to_lowercase())
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }
}

/// Canonical key for region ids and world names.
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}
