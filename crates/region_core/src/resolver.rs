//! # Flag Resolution
//!
//! [`FlagResolver`] computes the value of a flag at a point from the regions
//! that apply there. It holds no state beyond the borrowed regions and is
//! safe to use from many threads at once.
//!
//! ## Rules
//!
//! 1. Regions are walked by priority tier, highest first. Within a tier they
//!    are ordered by id.
//! 2. A region's effective value is its own value, or the nearest ancestor's,
//!    each filtered by that setter's role group against the actor's
//!    association with the region being evaluated.
//! 3. When a region contributes a value, its ancestors stop contributing.
//! 4. The first tier with any value decides. For state flags DENY dominates
//!    ALLOW within that tier; other flags return every tied value.
//! 5. Failing that, the global region's value, then the flag default.
//!
//! Flags that use membership as their default (`build`) only consult the
//! highest tier holding a non-passthrough region, and when that tier is
//! silent they answer with the membership test instead.

use crate::flags::defaults::PASSTHROUGH;
use crate::flags::{Association, Flag, FlagKind, FlagValue, RegionGroup, StateValue};
use crate::region::Region;
use crate::types::Actor;
use std::collections::{HashMap, HashSet};

/// Outcome of the membership test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipResult {
    /// No region counts at this point.
    NoRegions,
    /// The actor is a member of every counting region at the winning tier.
    Success,
    Fail,
}

#[derive(Debug, Clone)]
pub struct FlagResolver<'a> {
    /// Applicable regions, priority descending then id ascending
    regions: Vec<&'a Region>,
    by_id: HashMap<&'a str, &'a Region>,
    global: Option<&'a Region>,
}

impl<'a> FlagResolver<'a> {
    /// Creates a resolver over `regions` (matched regions plus ancestors).
    /// A global region passed in `regions` is ignored; pass it as `global`.
    pub fn new(regions: impl IntoIterator<Item = &'a Region>, global: Option<&'a Region>) -> Self {
        let mut regions: Vec<&'a Region> = regions.into_iter().filter(|r| !r.is_global()).collect();
        regions.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.id().cmp(b.id()))
        });
        regions.dedup_by(|a, b| a.id() == b.id());
        let by_id = regions.iter().map(|r| (r.id(), *r)).collect();

        Self { regions, by_id, global }
    }

    pub fn regions(&self) -> &[&'a Region] {
        &self.regions
    }

    pub fn global(&self) -> Option<&'a Region> {
        self.global
    }

    /// `region` followed by its ancestors that are part of this set.
    fn chain(&self, region: &'a Region) -> impl Iterator<Item = &'a Region> + '_ {
        let mut next = Some(region);
        let mut remaining = self.by_id.len() + 1;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let current = next?;
            next = current.parent().and_then(|p| self.by_id.get(p).copied());
            Some(current)
        })
    }

    /// How `actor` relates to `region`, counting ancestors' owners and members.
    pub fn association(&self, region: &'a Region, actor: Option<&Actor>) -> Association {
        let Some(actor) = actor else {
            return Association::NonMember;
        };
        if self.chain(region).any(|r| r.owners().contains(actor)) {
            Association::Owner
        } else if self.chain(region).any(|r| r.members().contains(actor)) {
            Association::Member
        } else {
            Association::NonMember
        }
    }

    /// Value of `flag` on `region` for `actor`, inheriting from ancestors.
    pub fn effective_value(&self, region: &'a Region, flag: &Flag, actor: Option<&Actor>) -> Option<FlagValue> {
        if region.is_global() {
            if flag.name() == PASSTHROUGH.name() {
                // A global region with members or owners acts like a regular region.
                let explicit = region.flag(flag).and_then(FlagValue::as_state);
                return if region.has_members_or_owners() || explicit == Some(StateValue::Deny) {
                    None
                } else {
                    Some(FlagValue::State(StateValue::Allow))
                };
            }
            if flag.uses_membership_as_default() {
                // The global region can only take this permission away.
                return region
                    .flag(flag)
                    .filter(|v| v.as_state() != Some(StateValue::Allow))
                    .cloned();
            }
        }

        let association = self.association(region, actor);
        self.chain(region).find_map(|current| {
            let value = current.flag(flag)?;
            current
                .effective_group(flag)
                .contains(association)
                .then(|| value.clone())
        })
    }

    fn is_passthrough(&self, region: &'a Region, actor: Option<&Actor>) -> bool {
        self.effective_value(region, &PASSTHROUGH, actor) == Some(FlagValue::State(StateValue::Allow))
    }

    /// Every value of `flag` that applies at the winning tier.
    ///
    /// State flags yield at most one value. Other flags yield every value
    /// found at the winning tier, duplicates included, in region order.
    pub fn query_all_values(&self, actor: Option<&Actor>, flag: &Flag) -> Vec<FlagValue> {
        let membership_default = flag.uses_membership_as_default();
        let cut_off = if membership_default {
            self.regions
                .iter()
                .find(|&&r| !self.is_passthrough(r, actor))
                .map(|r| r.priority())
        } else {
            None
        };

        let mut ignored: HashSet<&'a str> = HashSet::new();
        for tier in self.regions.chunk_by(|a, b| a.priority() == b.priority()) {
            if cut_off.is_some_and(|min| tier[0].priority() < min) {
                break;
            }

            let mut candidates: Vec<(&'a str, FlagValue)> = Vec::new();
            for &region in tier {
                if ignored.contains(region.id()) {
                    continue;
                }
                if let Some(value) = self.effective_value(region, flag, actor) {
                    ignored.extend(self.chain(region).skip(1).map(Region::id));
                    candidates.push((region.id(), value));
                }
            }
            candidates.retain(|(id, _)| !ignored.contains(id));

            if !candidates.is_empty() {
                return collapse(flag, candidates.into_iter().map(|(_, v)| v).collect());
            }
        }

        if cut_off.is_none() {
            if let Some(value) = self.global.and_then(|g| self.effective_value(g, flag, actor)) {
                return vec![value];
            }
        }

        if membership_default {
            match self.membership(actor) {
                MembershipResult::Fail => return Vec::new(),
                MembershipResult::Success => return vec![FlagValue::State(StateValue::Allow)],
                MembershipResult::NoRegions => {}
            }
        }

        flag.default_value().cloned().into_iter().collect()
    }

    /// A single value of `flag`: the combined state for state flags, the
    /// first tied value otherwise.
    pub fn query_value(&self, actor: Option<&Actor>, flag: &Flag) -> Option<FlagValue> {
        self.query_all_values(actor, flag).into_iter().next()
    }

    /// Resolves each state flag in turn and returns the first opinion found.
    pub fn query_state(&self, actor: Option<&Actor>, flags: &[&Flag]) -> Option<StateValue> {
        flags
            .iter()
            .find_map(|flag| self.query_value(actor, flag).and_then(|v| v.as_state()))
    }

    /// Whether the actor is a member of every region that counts at the
    /// highest counting tier. Passthrough regions do not count; the global
    /// region counts last, and only when it has owners or members.
    pub fn membership(&self, actor: Option<&Actor>) -> MembershipResult {
        let mut minimum: Option<i32> = None;
        let mut needs_clear: HashSet<&'a str> = HashSet::new();
        let mut has_cleared: HashSet<&'a str> = HashSet::new();

        let candidates = self
            .regions
            .iter()
            .copied()
            .map(|r| (r, r.priority()))
            .chain(self.global.map(|g| (g, i32::MIN)));

        for (region, priority) in candidates {
            if minimum.is_some_and(|min| priority < min) {
                break;
            }
            if self.is_passthrough(region, actor) {
                continue;
            }
            minimum = Some(priority);

            if has_cleared.contains(region.id()) {
                continue;
            }
            if RegionGroup::Members.contains(self.association(region, actor)) {
                for parent in self.chain(region).skip(1) {
                    if !needs_clear.remove(parent.id()) {
                        has_cleared.insert(parent.id());
                    }
                }
            } else {
                needs_clear.insert(region.id());
            }
        }

        match minimum {
            None => MembershipResult::NoRegions,
            Some(_) if needs_clear.is_empty() => MembershipResult::Success,
            Some(_) => MembershipResult::Fail,
        }
    }
}

fn collapse(flag: &Flag, values: Vec<FlagValue>) -> Vec<FlagValue> {
    if *flag.kind() != FlagKind::State {
        return values;
    }
    values
        .iter()
        .map(FlagValue::as_state)
        .fold(None, StateValue::combine)
        .map(FlagValue::State)
        .into_iter()
        .collect()
}
