//! Per-world region manager.
//!
//! A [`RegionManager`] owns one world's index behind an async `RwLock`.
//! Queries take the read side and never observe a half-applied mutation;
//! loads build a complete replacement index before swapping it in.

use crate::database::RegionDatabase;
use crate::error::StorageError;
use region_core::{
    normalize_id, Actor, ApplicableSet, BlockVector3, Domain, Flag, FlagRegistry, FlagValue, IndexKind, PlayerId,
    Region, RegionError, RegionGroup, RegionIndex, RemovalStrategy,
};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

pub struct RegionManager {
    world: String,
    kind: IndexKind,
    registry: Arc<FlagRegistry>,
    index: RwLock<Box<dyn RegionIndex>>,
}

impl std::fmt::Debug for RegionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionManager")
            .field("world", &self.world)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RegionManager {
    /// Creates a manager with an empty index.
    pub fn new(world: &str, kind: IndexKind, registry: Arc<FlagRegistry>) -> Self {
        Self {
            world: normalize_id(world),
            kind,
            registry,
            index: RwLock::new(kind.create()),
        }
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn index_kind(&self) -> IndexKind {
        self.kind
    }

    pub fn registry(&self) -> &Arc<FlagRegistry> {
        &self.registry
    }

    /// Read access to the index. Hold the guard only briefly; writers wait.
    pub async fn read(&self) -> RwLockReadGuard<'_, Box<dyn RegionIndex>> {
        self.index.read().await
    }

    /// Runs `f` against the regions applicable at `point`.
    pub async fn with_applicable<R>(&self, point: BlockVector3, f: impl FnOnce(&ApplicableSet<'_>) -> R) -> R {
        let index = self.index.read().await;
        let set = ApplicableSet::at_point(index.as_ref(), point);
        f(&set)
    }

    /// Ids of the regions applicable at `point`, highest priority first.
    pub async fn applicable_ids(&self, point: BlockVector3) -> Vec<String> {
        self.with_applicable(point, |set| set.ids().into_iter().map(str::to_string).collect())
            .await
    }

    pub async fn get_region(&self, id: &str) -> Option<Region> {
        self.index.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.index.read().await.contains_id(id)
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    pub async fn is_dirty(&self) -> bool {
        self.index.read().await.is_dirty()
    }

    pub async fn region_count_owned_by(&self, actor: &Actor) -> usize {
        self.index.read().await.region_count_owned_by(actor)
    }

    /// Whether `candidate` overlaps any stored region not owned by `actor`.
    ///
    /// # Errors
    ///
    /// [`RegionError::UnsupportedIntersection`] when `candidate` has no
    /// boundary to test.
    pub async fn overlaps_unowned_region(&self, candidate: &Region, actor: &Actor) -> Result<bool, RegionError> {
        let index = self.index.read().await;
        let overlapping = index.applicable_overlap(candidate)?;
        Ok(candidate.overlaps_unowned(overlapping, actor))
    }

    /// Prepares fast lookups for chunk columns the host has loaded. Only
    /// [`IndexKind::Chunk`] keeps anything.
    pub async fn bias_chunks(&self, chunks: &[(i32, i32)]) {
        self.index.read().await.bias_chunks(chunks);
    }

    /// Releases chunk columns the host has unloaded.
    pub async fn forget_chunks(&self, chunks: &[(i32, i32)]) {
        self.index.read().await.forget_chunks(chunks);
    }

    pub async fn biased_chunks(&self) -> Vec<(i32, i32)> {
        self.index.read().await.biased_chunks()
    }

    /// Adds or replaces a region. Returns the replaced region.
    pub async fn add_region(&self, region: Region) -> Option<Region> {
        debug!(world = %self.world, region = %region.id(), "Adding region");
        self.index.write().await.add(region)
    }

    /// Removes a region, and its descendants unless `strategy` says otherwise.
    pub async fn remove_region(&self, id: &str, strategy: RemovalStrategy) -> Vec<Region> {
        let removed = self.index.write().await.remove(id, strategy);
        debug!(world = %self.world, region = %id, removed = removed.len(), "Removed regions");
        removed
    }

    pub async fn set_flag(&self, id: &str, flag: &Flag, value: Option<FlagValue>) -> Result<(), RegionError> {
        self.edit(id, |region| region.set_flag(flag, value)).await
    }

    /// Parses `input` for the named flag and sets it. `none` clears state flags.
    pub async fn set_flag_input(&self, id: &str, flag: &str, input: &str) -> Result<(), RegionError> {
        let flag = self
            .registry
            .get(flag)
            .ok_or_else(|| RegionError::UnknownFlag(flag.to_string()))?;
        let value = flag.parse_input(input)?;
        self.set_flag(id, &flag, value).await
    }

    pub async fn set_group(&self, id: &str, flag: &Flag, group: Option<RegionGroup>) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.set_group(flag, group);
            Ok(())
        })
        .await
    }

    pub async fn set_priority(&self, id: &str, priority: i32) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.set_priority(priority);
            Ok(())
        })
        .await
    }

    /// Assigns or clears the parent. Fails without effect on a cycle.
    pub async fn set_parent(&self, id: &str, parent: Option<&str>) -> Result<(), RegionError> {
        self.index.write().await.set_parent(id, parent)
    }

    pub async fn set_owners(&self, id: &str, owners: Domain) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.set_owners(owners);
            Ok(())
        })
        .await
    }

    pub async fn add_owner(&self, id: &str, player: PlayerId) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.owners_mut().add_player(player);
            Ok(())
        })
        .await
    }

    pub async fn remove_owner(&self, id: &str, player: &PlayerId) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.owners_mut().remove_player(player);
            Ok(())
        })
        .await
    }

    pub async fn set_members(&self, id: &str, members: Domain) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.set_members(members);
            Ok(())
        })
        .await
    }

    pub async fn add_member(&self, id: &str, player: PlayerId) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.members_mut().add_player(player);
            Ok(())
        })
        .await
    }

    pub async fn remove_member(&self, id: &str, player: &PlayerId) -> Result<(), RegionError> {
        self.edit(id, |region| {
            region.members_mut().remove_player(player);
            Ok(())
        })
        .await
    }

    async fn edit<R>(&self, id: &str, f: impl FnOnce(&mut Region) -> Result<R, RegionError>) -> Result<R, RegionError> {
        let mut index = self.index.write().await;
        let region = index
            .region_mut(id)
            .ok_or_else(|| RegionError::UnknownRegion(normalize_id(id)))?;
        f(region)
    }

    /// Replaces the index with the contents of `db`.
    ///
    /// The new index is built before the write lock is taken. On error the
    /// current index keeps serving queries.
    pub async fn load(&self, db: &dyn RegionDatabase) -> Result<usize, StorageError> {
        let regions = db.load(&self.registry).await?;
        let mut fresh = self.kind.create();
        fresh.add_all(regions);
        fresh.take_changes();
        let count = fresh.len();

        let mut index = self.index.write().await;
        fresh.bias_chunks(&index.biased_chunks());
        *index = fresh;
        debug!(world = %self.world, store = %db.name(), count, "Swapped in loaded index");
        Ok(count)
    }

    /// Writes every region. Recorded changes are restored if the write fails.
    pub async fn save(&self, db: &dyn RegionDatabase) -> Result<(), StorageError> {
        let (regions, changes) = self.snapshot(true).await;
        if let Err(e) = db.save_all(&regions).await {
            self.index.write().await.restore_changes(changes);
            return Err(e);
        }
        Ok(())
    }

    /// Writes pending changes, if any. Returns whether anything was written.
    pub async fn save_changes(&self, db: &dyn RegionDatabase) -> Result<bool, StorageError> {
        let (regions, changes) = self.snapshot(false).await;
        if changes.is_empty() {
            return Ok(false);
        }
        if let Err(e) = db.save_changes(&regions, &changes).await {
            self.index.write().await.restore_changes(changes);
            return Err(e);
        }
        Ok(true)
    }

    async fn snapshot(&self, always: bool) -> (Vec<Region>, region_core::ChangeSet) {
        let mut index = self.index.write().await;
        if !always && !index.is_dirty() {
            return (Vec::new(), Default::default());
        }
        let changes = index.take_changes();
        let mut regions: Vec<Region> = index.map().iter().cloned().collect();
        regions.sort_by(|a, b| a.id().cmp(b.id()));
        (regions, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use region_core::flags::defaults::{BUILD, PVP};
    use region_core::{Geometry, StateValue};

    fn manager() -> RegionManager {
        RegionManager::new("World", IndexKind::RTree, Arc::new(FlagRegistry::with_defaults()))
    }

    fn cuboid(id: &str, from: i32, to: i32) -> Region {
        Region::new(
            id,
            Geometry::cuboid(BlockVector3::new(from, 0, from), BlockVector3::new(to, 255, to)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mutations_and_queries() {
        let manager = manager();
        assert_eq!(manager.world(), "world");

        manager.add_region(cuboid("town", 0, 100)).await;
        manager.add_region(cuboid("shop", 10, 20)).await;
        manager.set_parent("shop", Some("town")).await.unwrap();
        manager.set_priority("shop", 5).await.unwrap();
        manager
            .set_flag("town", &PVP, Some(StateValue::Deny.into()))
            .await
            .unwrap();

        let ids = manager.applicable_ids(BlockVector3::new(15, 64, 15)).await;
        assert_eq!(ids, vec!["shop".to_string(), "town".to_string()]);

        let pvp = manager
            .with_applicable(BlockVector3::new(15, 64, 15), |set| set.allows(&PVP, None))
            .await;
        assert!(!pvp);

        let err = manager.set_priority("nowhere", 1).await.unwrap_err();
        assert_eq!(err, RegionError::UnknownRegion("nowhere".to_string()));
    }

    #[tokio::test]
    async fn test_cycle_is_rejected_without_effect() {
        let manager = manager();
        manager.add_region(cuboid("a", 0, 10)).await;
        manager.add_region(cuboid("b", 0, 10)).await;
        manager.set_parent("b", Some("a")).await.unwrap();

        let err = manager.set_parent("a", Some("b")).await.unwrap_err();
        assert!(matches!(err, RegionError::CircularInheritance { .. }));
        assert_eq!(manager.get_region("a").await.unwrap().parent(), None);
        assert_eq!(manager.get_region("b").await.unwrap().parent(), Some("a"));
    }

    #[tokio::test]
    async fn test_members_and_owners() {
        let manager = manager();
        let alice = PlayerId::new();
        manager.add_region(cuboid("plot", 0, 10)).await;
        manager.set_flag("plot", &BUILD, Some(StateValue::Deny.into())).await.unwrap();
        manager.add_member("plot", alice).await.unwrap();

        let point = BlockVector3::new(5, 5, 5);
        let actor = Actor::new(alice);
        assert!(manager.with_applicable(point, |set| set.can_build(&actor)).await);

        manager.remove_member("plot", &alice).await.unwrap();
        assert!(!manager.with_applicable(point, |set| set.can_build(&actor)).await);

        manager.add_owner("plot", alice).await.unwrap();
        assert_eq!(manager.region_count_owned_by(&actor).await, 1);
        manager.remove_owner("plot", &alice).await.unwrap();
        assert_eq!(manager.region_count_owned_by(&actor).await, 0);
    }

    #[tokio::test]
    async fn test_set_flag_input_parses_through_registry() {
        let manager = manager();
        manager.add_region(cuboid("arena", 0, 10)).await;
        manager.set_flag_input("arena", "PvP", "allow").await.unwrap();
        assert_eq!(
            manager.get_region("arena").await.unwrap().flag(&PVP),
            Some(&FlagValue::State(StateValue::Allow))
        );

        manager.set_flag_input("arena", "pvp", "none").await.unwrap();
        assert_eq!(manager.get_region("arena").await.unwrap().flag(&PVP), None);

        assert!(matches!(
            manager.set_flag_input("arena", "bogus", "allow").await,
            Err(RegionError::UnknownFlag(_))
        ));
        assert!(manager.set_flag_input("arena", "pvp", "maybe").await.is_err());
    }

    #[tokio::test]
    async fn test_overlap_check() {
        let manager = manager();
        let alice = Actor::new(PlayerId::new());
        let mut mine = cuboid("mine", 0, 10);
        mine.owners_mut().add_player(alice.id);
        manager.add_region(mine).await;

        let claim = cuboid("claim", 5, 15);
        assert!(!manager.overlaps_unowned_region(&claim, &alice).await.unwrap());

        manager.add_region(cuboid("theirs", 12, 20)).await;
        assert!(manager.overlaps_unowned_region(&claim, &alice).await.unwrap());

        assert!(manager
            .overlaps_unowned_region(&Region::global(), &alice)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_save_changes_and_restore_on_failure() {
        let manager = manager();
        let db = MemoryDatabase::new();

        assert!(!manager.save_changes(&db).await.unwrap());

        manager.add_region(cuboid("a", 0, 10)).await;
        assert!(manager.is_dirty().await);

        db.set_fail_saves(true);
        assert!(manager.save_changes(&db).await.is_err());
        assert!(manager.is_dirty().await);

        db.set_fail_saves(false);
        assert!(manager.save_changes(&db).await.unwrap());
        assert!(!manager.is_dirty().await);
        assert_eq!(db.snapshot().await.len(), 1);

        manager.remove_region("a", RemovalStrategy::default()).await;
        assert!(manager.save_changes(&db).await.unwrap());
        let changes = db.last_changes().await.unwrap();
        assert!(changes.removed.contains("a"));
        assert!(db.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_biased_chunks_survive_reload() {
        let manager = RegionManager::new("world", IndexKind::Chunk, Arc::new(FlagRegistry::with_defaults()));
        manager.bias_chunks(&[(0, 0), (1, 1)]).await;
        manager.add_region(cuboid("spawn", 0, 20)).await;
        assert_eq!(
            manager.applicable_ids(BlockVector3::new(18, 64, 18)).await,
            vec!["spawn".to_string()]
        );

        let db = MemoryDatabase::with_regions(vec![cuboid("stored", 0, 10)]);
        manager.load(&db).await.unwrap();
        assert_eq!(manager.biased_chunks().await, vec![(0, 0), (1, 1)]);
        assert_eq!(
            manager.applicable_ids(BlockVector3::new(5, 64, 5)).await,
            vec!["stored".to_string()]
        );

        manager.forget_chunks(&[(1, 1)]).await;
        assert_eq!(manager.biased_chunks().await, vec![(0, 0)]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_current_index() {
        let manager = manager();
        manager.add_region(cuboid("kept", 0, 10)).await;

        let db = MemoryDatabase::with_regions(vec![cuboid("stored", 0, 10)]);
        db.set_fail_loads(true);
        assert!(manager.load(&db).await.is_err());
        assert!(manager.contains("kept").await);

        db.set_fail_loads(false);
        assert_eq!(manager.load(&db).await.unwrap(), 1);
        assert!(!manager.contains("kept").await);
        assert!(manager.contains("stored").await);
        assert!(!manager.is_dirty().await);
    }
}
