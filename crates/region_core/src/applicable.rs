//! The set of regions that apply at a point, and the questions hosts ask
//! of it.

use crate::flags::defaults::BUILD;
use crate::flags::{Association, Flag, FlagValue, StateValue};
use crate::index::RegionIndex;
use crate::region::Region;
use crate::resolver::{FlagResolver, MembershipResult};
use crate::types::{Actor, BlockVector3};

/// Regions containing a point, their ancestors, and the world's global
/// region.
#[derive(Debug, Clone)]
pub struct ApplicableSet<'a> {
    resolver: FlagResolver<'a>,
}

impl<'a> ApplicableSet<'a> {
    pub fn new(regions: impl IntoIterator<Item = &'a Region>, global: Option<&'a Region>) -> Self {
        Self {
            resolver: FlagResolver::new(regions, global),
        }
    }

    /// Queries `index` at `point`.
    pub fn at_point<I: RegionIndex + ?Sized>(index: &'a I, point: BlockVector3) -> Self {
        Self::new(index.applicable_point(point), index.global_region())
    }

    pub fn resolver(&self) -> &FlagResolver<'a> {
        &self.resolver
    }

    /// Applicable regions, highest priority first. Excludes the global region.
    pub fn iter(&self) -> impl Iterator<Item = &'a Region> + '_ {
        self.resolver.regions().iter().copied()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.iter().map(Region::id).collect()
    }

    pub fn len(&self) -> usize {
        self.resolver.regions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolver.regions().is_empty()
    }

    /// Whether the state flag resolves to ALLOW. No opinion is not ALLOW.
    pub fn allows(&self, flag: &Flag, actor: Option<&Actor>) -> bool {
        self.test_state(actor, &[flag])
    }

    /// Whether the first flag with an opinion says ALLOW.
    pub fn test_state(&self, actor: Option<&Actor>, flags: &[&Flag]) -> bool {
        self.query_state(actor, flags) == Some(StateValue::Allow)
    }

    pub fn query_state(&self, actor: Option<&Actor>, flags: &[&Flag]) -> Option<StateValue> {
        self.resolver.query_state(actor, flags)
    }

    pub fn query_value(&self, actor: Option<&Actor>, flag: &Flag) -> Option<FlagValue> {
        self.resolver.query_value(actor, flag)
    }

    pub fn query_all_values(&self, actor: Option<&Actor>, flag: &Flag) -> Vec<FlagValue> {
        self.resolver.query_all_values(actor, flag)
    }

    /// Single value of `flag`, one of [`Self::get_values`].
    pub fn get_value(&self, flag: &Flag, actor: Option<&Actor>) -> Option<FlagValue> {
        self.query_value(actor, flag)
    }

    pub fn get_values(&self, flag: &Flag, actor: Option<&Actor>) -> Vec<FlagValue> {
        self.query_all_values(actor, flag)
    }

    pub fn membership(&self, actor: Option<&Actor>) -> MembershipResult {
        self.resolver.membership(actor)
    }

    /// Whether `actor` may build here, decided by the `build` flag and,
    /// when no region sets it, by region membership.
    pub fn can_build(&self, actor: &Actor) -> bool {
        self.test_state(Some(actor), &[&*BUILD])
    }

    /// Owner of every applicable region, directly or through an ancestor.
    pub fn is_owner_of_all(&self, actor: &Actor) -> bool {
        self.iter()
            .all(|r| self.resolver.association(r, Some(actor)) == Association::Owner)
    }

    /// Owner or member of every applicable region.
    pub fn is_member_of_all(&self, actor: &Actor) -> bool {
        self.iter()
            .all(|r| self.resolver.association(r, Some(actor)) != Association::NonMember)
    }
}
