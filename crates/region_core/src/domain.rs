//! Owner and member sets of a region.

use crate::types::{Actor, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of players and permission groups.
///
/// An actor is contained when their id is listed or when any group they
/// belong to is listed. Group names are kept lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    players: BTreeSet<PlayerId>,
    #[serde(default)]
    groups: BTreeSet<String>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, player: PlayerId) -> bool {
        self.players.insert(player)
    }

    pub fn remove_player(&mut self, player: &PlayerId) -> bool {
        self.players.remove(player)
    }

    pub fn add_group(&mut self, group: &str) -> bool {
        self.groups.insert(group.to_lowercase())
    }

    pub fn remove_group(&mut self, group: &str) -> bool {
        self.groups.remove(&group.to_lowercase())
    }

    pub fn contains_player(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains(&group.to_lowercase())
    }

    /// Tests whether the actor is listed directly or through one of their groups.
    pub fn contains(&self, actor: &Actor) -> bool {
        self.players.contains(&actor.id) || actor.groups().any(|g| self.groups.contains(g))
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Merges every entry of `other` into this domain.
    pub fn add_all(&mut self, other: &Domain) {
        self.players.extend(other.players.iter().copied());
        self.groups.extend(other.groups.iter().cloned());
    }

    pub fn remove_all(&mut self, other: &Domain) {
        for player in &other.players {
            self.players.remove(player);
        }
        for group in &other.groups {
            self.groups.remove(group);
        }
    }

    /// Number of players plus number of groups.
    pub fn len(&self) -> usize {
        self.players.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.groups.clear();
    }
}
