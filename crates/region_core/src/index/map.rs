use super::{ChangeSet, RemovalStrategy};
use crate::error::RegionError;
use crate::region::{Region, GLOBAL_REGION};
use crate::types::{normalize_id, Actor};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Authoritative `id -> Region` storage shared by every index
/// implementation.
///
/// Keys are normalized ids. Parent links are ids resolved against this map;
/// the map keeps them acyclic and pointing at stored regions.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: HashMap<String, Region>,
    removed: BTreeSet<String>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.get(&normalize_id(id))
    }

    /// Mutable access for in-place edits. Parent and geometry cannot be
    /// changed through a `&mut Region`.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions.get_mut(&normalize_id(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.regions.contains_key(&normalize_id(id))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Inserts or replaces a region, then validates its parent link.
    ///
    /// A parent that is unknown, would close a cycle, or involves the global
    /// region is cleared with a warning. Children of a replaced region now resolve to the replacement.
    pub(crate) fn insert(&mut self, region: Region) -> Option<Region> {
        let id = region.id().to_string();
        let previous = self.regions.insert(id.clone(), region);
        self.repair_parent(&id);
        previous
    }

    /// Inserts every region first, then validates all parent links, so
    /// regions may arrive in any order.
    pub(crate) fn insert_all(&mut self, regions: Vec<Region>) -> Vec<Region> {
        let mut ids = Vec::with_capacity(regions.len());
        let mut replaced = Vec::new();
        for region in regions {
            let id = region.id().to_string();
            if let Some(old) = self.regions.insert(id.clone(), region) {
                replaced.push(old);
            }
            ids.push(id);
        }
        for id in &ids {
            self.repair_parent(id);
        }
        replaced
    }

    fn repair_parent(&mut self, id: &str) {
        let Some(parent) = self.regions.get(id).and_then(|r| r.parent().map(str::to_string)) else {
            return;
        };

        let reason = if id == GLOBAL_REGION || parent == GLOBAL_REGION {
            Some("the global region cannot inherit or be inherited from")
        } else if !self.regions.contains_key(&parent) {
            Some("unknown parent")
        } else if self.would_cycle(id, &parent) {
            Some("parent would create a cycle")
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(region = %id, parent = %parent, "⚠️ Dropping parent link: {}", reason);
            if let Some(region) = self.regions.get_mut(id) {
                region.set_parent_unchecked(None);
            }
        }
    }

    /// Whether making `parent` the parent of `child` would create a cycle.
    ///
    /// A chain longer than the map can only be a cycle already present.
    fn would_cycle(&self, child: &str, parent: &str) -> bool {
        let mut cursor = Some(parent);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == child || steps > self.regions.len() {
                return true;
            }
            steps += 1;
            cursor = self.regions.get(current).and_then(Region::parent);
        }
        false
    }

    /// Assigns or clears a parent after checking for cycles.
    ///
    /// # Errors
    ///
    /// - [`RegionError::UnknownRegion`] if either id is not stored
    /// - [`RegionError::GlobalInheritance`] if either id is the global region
    /// - [`RegionError::CircularInheritance`] if `parent` is `id` or one of
    ///   its descendants
    ///
    /// On error nothing is changed.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<(), RegionError> {
        let id = normalize_id(id);
        if !self.regions.contains_key(&id) {
            return Err(RegionError::UnknownRegion(id));
        }

        let parent = match parent {
            Some(p) => {
                let p = normalize_id(p);
                if !self.regions.contains_key(&p) {
                    return Err(RegionError::UnknownRegion(p));
                }
                if id == GLOBAL_REGION || p == GLOBAL_REGION {
                    return Err(RegionError::GlobalInheritance(id));
                }
                if self.would_cycle(&id, &p) {
                    return Err(RegionError::CircularInheritance { child: id, parent: p });
                }
                Some(p)
            }
            None => None,
        };

        if let Some(region) = self.regions.get_mut(&id) {
            region.set_parent_unchecked(parent);
        }
        Ok(())
    }

    /// Iterates the parent chain of `region`, nearest ancestor first.
    pub fn ancestors<'a>(&'a self, region: &'a Region) -> Ancestors<'a> {
        Ancestors {
            map: self,
            next: region.parent(),
            remaining: self.regions.len(),
        }
    }

    /// Removes a region according to `strategy`. Returns the removed regions,
    /// descendants before their ancestors. Unknown ids remove nothing.
    pub(crate) fn remove(&mut self, id: &str, strategy: RemovalStrategy) -> Vec<Region> {
        let id = normalize_id(id);
        if !self.regions.contains_key(&id) {
            return Vec::new();
        }

        let mut order = Vec::new();
        match strategy {
            RemovalStrategy::RemoveChildren => {
                let children = self.children_by_parent();
                collect_descendants(&id, &children, &mut order, &mut HashSet::new());
            }
            RemovalStrategy::UnsetParentInChildren => {
                for region in self.regions.values_mut() {
                    if region.parent() == Some(id.as_str()) {
                        region.set_parent_unchecked(None);
                    }
                }
            }
        }
        order.push(id);

        let mut removed = Vec::with_capacity(order.len());
        for key in order {
            if let Some(region) = self.regions.remove(&key) {
                self.removed.insert(key);
                removed.push(region);
            }
        }
        removed
    }

    fn children_by_parent(&self) -> HashMap<String, Vec<String>> {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for region in self.regions.values() {
            if let Some(parent) = region.parent() {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(region.id().to_string());
            }
        }
        for list in children.values_mut() {
            list.sort();
        }
        children
    }

    /// Adds every ancestor of the matched regions, without duplicates.
    pub fn with_ancestors<'a>(&'a self, matched: Vec<&'a Region>) -> Vec<&'a Region> {
        let mut seen: HashSet<&str> = matched.iter().map(|r| r.id()).collect();
        let mut out = matched.clone();
        for region in matched {
            for ancestor in self.ancestors(region) {
                if !seen.insert(ancestor.id()) {
                    break;
                }
                out.push(ancestor);
            }
        }
        out
    }

    pub fn count_owned_by(&self, actor: &Actor) -> usize {
        self.regions.values().filter(|r| r.owners().contains(actor)).count()
    }

    pub fn is_dirty(&self) -> bool {
        !self.removed.is_empty() || self.regions.values().any(Region::is_dirty)
    }

    /// Returns and clears the changes recorded since the last call.
    pub fn take_changes(&mut self) -> ChangeSet {
        let mut changed = BTreeSet::new();
        for region in self.regions.values_mut() {
            if region.is_dirty() {
                changed.insert(region.id().to_string());
                region.set_dirty(false);
            }
        }
        ChangeSet {
            changed,
            removed: std::mem::take(&mut self.removed),
        }
    }

    /// Re-marks a change set, typically after a failed save.
    pub fn restore_changes(&mut self, changes: ChangeSet) {
        for id in &changes.changed {
            if let Some(region) = self.regions.get_mut(id) {
                region.set_dirty(true);
            }
        }
        for id in changes.removed {
            if !self.regions.contains_key(&id) {
                self.removed.insert(id);
            }
        }
    }
}

fn collect_descendants(
    id: &str,
    children: &HashMap<String, Vec<String>>,
    out: &mut Vec<String>,
    visited: &mut HashSet<String>,
) {
    let Some(list) = children.get(id) else {
        return;
    };
    for child in list {
        if visited.insert(child.clone()) {
            collect_descendants(child, children, out, visited);
            out.push(child.clone());
        }
    }
}

/// Parent-chain iterator returned by [`RegionMap::ancestors`].
pub struct Ancestors<'a> {
    map: &'a RegionMap,
    next: Option<&'a str>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Region;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let region = self.map.regions.get(self.next?)?;
        self.next = region.parent();
        Some(region)
    }
}
