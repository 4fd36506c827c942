//! Role groups that scope a flag value to a subset of actors.

use crate::error::RegionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an actor relates to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    Owner,
    Member,
    NonMember,
}

/// Which actors a flag value applies to on a given region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionGroup {
    All,
    Members,
    #[serde(rename = "nonmembers")]
    NonMembers,
    Owners,
    #[serde(rename = "nonowners")]
    NonOwners,
    None,
}

impl RegionGroup {
    /// Whether an actor with the given association falls in this group.
    ///
    /// Owners count as members; members count as non-owners.
    pub fn contains(self, association: Association) -> bool {
        match self {
            RegionGroup::All => true,
            RegionGroup::Members => matches!(association, Association::Owner | Association::Member),
            RegionGroup::NonMembers => association == Association::NonMember,
            RegionGroup::Owners => association == Association::Owner,
            RegionGroup::NonOwners => matches!(association, Association::Member | Association::NonMember),
            RegionGroup::None => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegionGroup::All => "all",
            RegionGroup::Members => "members",
            RegionGroup::NonMembers => "nonmembers",
            RegionGroup::Owners => "owners",
            RegionGroup::NonOwners => "nonowners",
            RegionGroup::None => "none",
        }
    }
}

impl fmt::Display for RegionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionGroup {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "member" | "members" => Ok(RegionGroup::Members),
            "owner" | "owners" => Ok(RegionGroup::Owners),
            "nonmember" | "nonmembers" | "non_members" | "non-members" => Ok(RegionGroup::NonMembers),
            "nonowner" | "nonowners" | "non_owners" | "non-owners" => Ok(RegionGroup::NonOwners),
            "all" | "everyone" | "anyone" => Ok(RegionGroup::All),
            "none" | "nobody" | "noone" | "deny" => Ok(RegionGroup::None),
            other => Err(RegionError::InvalidGroup(other.to_string())),
        }
    }
}
