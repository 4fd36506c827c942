//! # Region Entity
//!
//! A [`Region`] is a named, prioritized shape with owner and member
//! [`Domain`]s and a sparse map of flag values. Parent links are stored as
//! normalized ids and are only changed through a
//! [`RegionIndex`](crate::index::RegionIndex), which checks them for cycles.

use crate::domain::Domain;
use crate::error::RegionError;
use crate::flags::{Flag, FlagValue, RegionGroup};
use crate::geometry::Geometry;
use crate::types::{normalize_id, Actor};
use std::collections::BTreeMap;

/// Id of the implicit world-wide region.
pub const GLOBAL_REGION: &str = "__global__";

/// Whether `id` is acceptable as a region id.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '\'' | '-' | '+' | '/'))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: String,
    geometry: Geometry,
    priority: i32,
    parent: Option<String>,
    owners: Domain,
    members: Domain,
    flags: BTreeMap<String, FlagValue>,
    groups: BTreeMap<String, RegionGroup>,
    dirty: bool,
}

impl Region {
    /// Creates a region. The id is stored normalized.
    ///
    /// The global region is only built by [`Region::global`].
    ///
    /// # Errors
    ///
    /// - [`RegionError::InvalidRegionId`] for ids outside `[A-Za-z0-9_,'\-+/]`
    ///   and for the reserved [`GLOBAL_REGION`] id
    /// - [`RegionError::InvalidGeometry`] for [`Geometry::Global`]
    pub fn new(id: &str, geometry: Geometry) -> Result<Self, RegionError> {
        let normalized = normalize_id(id);
        if !is_valid_id(id) || normalized == GLOBAL_REGION {
            return Err(RegionError::InvalidRegionId(id.to_string()));
        }
        if !geometry.is_physical() {
            return Err(RegionError::InvalidGeometry(format!(
                "global geometry is reserved for {GLOBAL_REGION}"
            )));
        }
        Ok(Self {
            id: normalized,
            geometry,
            priority: 0,
            parent: None,
            owners: Domain::new(),
            members: Domain::new(),
            flags: BTreeMap::new(),
            groups: BTreeMap::new(),
            dirty: true,
        })
    }

    /// The world-wide fallback region.
    pub fn global() -> Self {
        Self {
            id: GLOBAL_REGION.to_string(),
            geometry: Geometry::Global,
            priority: 0,
            parent: None,
            owners: Domain::new(),
            members: Domain::new(),
            flags: BTreeMap::new(),
            groups: BTreeMap::new(),
            dirty: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn is_global(&self) -> bool {
        matches!(self.geometry, Geometry::Global)
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.dirty = true;
        self.priority = priority;
    }

    /// Normalized id of the parent region, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Records a parent id without validation. Used while loading, before
    /// the index resolves links.
    pub fn with_parent_id(mut self, parent: Option<&str>) -> Self {
        self.parent = parent.map(normalize_id);
        self
    }

    pub(crate) fn set_parent_unchecked(&mut self, parent: Option<String>) {
        self.dirty = true;
        self.parent = parent;
    }

    pub fn owners(&self) -> &Domain {
        &self.owners
    }

    pub fn members(&self) -> &Domain {
        &self.members
    }

    pub fn owners_mut(&mut self) -> &mut Domain {
        self.dirty = true;
        &mut self.owners
    }

    pub fn members_mut(&mut self) -> &mut Domain {
        self.dirty = true;
        &mut self.members
    }

    pub fn set_owners(&mut self, owners: Domain) {
        self.dirty = true;
        self.owners = owners;
    }

    pub fn set_members(&mut self, members: Domain) {
        self.dirty = true;
        self.members = members;
    }

    /// Listed as owner of this region alone; ancestors are not consulted.
    pub fn is_owner(&self, actor: &Actor) -> bool {
        self.owners.contains(actor)
    }

    /// Listed as owner or member of this region alone.
    pub fn is_member(&self, actor: &Actor) -> bool {
        self.owners.contains(actor) || self.members.contains(actor)
    }

    pub fn has_members_or_owners(&self) -> bool {
        !self.owners.is_empty() || !self.members.is_empty()
    }

    /// Explicit value for `flag` on this region only.
    pub fn flag(&self, flag: &Flag) -> Option<&FlagValue> {
        self.flags.get(flag.name())
    }

    /// Sets or clears a flag value.
    ///
    /// # Errors
    ///
    /// [`RegionError::InvalidFlagValue`] when the value does not have the
    /// flag's type; the region is left unchanged.
    pub fn set_flag(&mut self, flag: &Flag, value: Option<FlagValue>) -> Result<(), RegionError> {
        match value {
            Some(value) => {
                flag.validate(&value)?;
                self.flags.insert(flag.name().to_string(), value);
            }
            None => {
                self.flags.remove(flag.name());
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Removes the value and group for `flag`, returning the old value.
    pub fn clear_flag(&mut self, flag: &Flag) -> Option<FlagValue> {
        self.groups.remove(flag.name());
        let previous = self.flags.remove(flag.name());
        self.dirty = true;
        previous
    }

    /// Explicit group for `flag` on this region, if one was set.
    pub fn group(&self, flag: &Flag) -> Option<RegionGroup> {
        self.groups.get(flag.name()).copied()
    }

    /// Explicit group or the flag's default group.
    pub fn effective_group(&self, flag: &Flag) -> RegionGroup {
        self.group(flag).unwrap_or_else(|| flag.default_group())
    }

    /// Sets the group for `flag`. Setting the default group removes the entry.
    pub fn set_group(&mut self, flag: &Flag, group: Option<RegionGroup>) {
        match group {
            Some(g) if g != flag.default_group() => {
                self.groups.insert(flag.name().to_string(), g);
            }
            _ => {
                self.groups.remove(flag.name());
            }
        }
        self.dirty = true;
    }

    /// Raw flag map keyed by flag name.
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Raw group map keyed by flag name.
    pub fn groups(&self) -> &BTreeMap<String, RegionGroup> {
        &self.groups
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Whether any region in `others` (other than this one) is not owned by
    /// `actor`. Claim validation rejects a claim overlapping such a region.
    pub fn overlaps_unowned<'a>(&self, others: impl IntoIterator<Item = &'a Region>, actor: &Actor) -> bool {
        others
            .into_iter()
            .any(|other| other.id != self.id && !other.owners.contains(actor))
    }
}
