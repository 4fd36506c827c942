//! # World Container
//!
//! [`RegionContainer`] keeps one [`RegionManager`] per world and schedules
//! their persistence.
//!
//! Loads and saves are single-flight per world. Asking for an operation that
//! is already pending attaches to it; asking for a load while a save is
//! pending (or the reverse) voids the pending one, whose waiters then see
//! [`OpOutcome::Voided`]. A voided operation that has not reached the store
//! yet is skipped. One that has already started runs to completion, and the
//! per-world I/O lock keeps the next operation waiting until it has.

use crate::database::{RegionDatabase, RegionDriver};
use crate::error::{ContainerError, StorageError};
use crate::manager::RegionManager;
use crate::shutdown::ShutdownState;
use dashmap::{DashMap, DashSet};
use futures::future::{BoxFuture, FutureExt, Shared};
use region_core::{normalize_id, FlagRegistry, IndexKind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Result of a load or save as seen by its waiters.
#[derive(Debug, Clone)]
pub enum OpOutcome {
    Completed,
    Failed(Arc<StorageError>),
    /// Superseded by a conflicting operation on the same world
    Voided,
}

impl OpOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, OpOutcome::Completed)
    }

    pub fn into_result(self, world: &str) -> Result<(), ContainerError> {
        match self {
            OpOutcome::Completed => Ok(()),
            OpOutcome::Failed(e) => Err(ContainerError::Storage(e)),
            OpOutcome::Voided => Err(ContainerError::Voided(world.to_string())),
        }
    }
}

/// Awaitable handle shared by every caller attached to one operation.
pub type OpHandle = Shared<BoxFuture<'static, OpOutcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Load,
    Save,
}

impl OpKind {
    fn opposite(self) -> Self {
        match self {
            OpKind::Load => OpKind::Save,
            OpKind::Save => OpKind::Load,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub index_kind: IndexKind,
    /// How often dirty worlds are saved in the background
    pub save_interval: Duration,
    /// How often worlds that failed to load are retried
    pub load_retry_interval: Duration,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::default(),
            save_interval: Duration::from_secs(30),
            load_retry_interval: Duration::from_secs(30),
        }
    }
}

struct PendingOp {
    id: u64,
    handle: OpHandle,
    void_tx: oneshot::Sender<()>,
    voided: Arc<AtomicBool>,
}

impl PendingOp {
    fn void(self) {
        self.voided.store(true, Ordering::Release);
        let _ = self.void_tx.send(());
    }
}

#[derive(Default)]
struct Pending {
    load: Option<PendingOp>,
    save: Option<PendingOp>,
}

impl Pending {
    fn slot(&mut self, kind: OpKind) -> &mut Option<PendingOp> {
        match kind {
            OpKind::Load => &mut self.load,
            OpKind::Save => &mut self.save,
        }
    }
}

struct World {
    name: String,
    manager: Arc<RegionManager>,
    database: Arc<dyn RegionDatabase>,
    /// Set by the first successful load
    loaded: AtomicBool,
    io_lock: tokio::sync::Mutex<()>,
    pending: std::sync::Mutex<Pending>,
}

impl World {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the pending slot if it still belongs to operation `id`.
    fn finish(&self, kind: OpKind, id: u64) {
        let mut pending = self.pending();
        let slot = pending.slot(kind);
        if slot.as_ref().is_some_and(|op| op.id == id) {
            *slot = None;
        }
    }
}

struct ContainerState {
    driver: Arc<dyn RegionDriver>,
    registry: Arc<FlagRegistry>,
    config: ContainerConfig,
    worlds: DashMap<String, Arc<World>>,
    failing_loads: DashSet<String>,
    failing_saves: DashSet<String>,
    next_op: AtomicU64,
}

impl ContainerState {
    fn is_registered(&self, world: &Arc<World>) -> bool {
        self.worlds
            .get(&world.name)
            .is_some_and(|current| Arc::ptr_eq(current.value(), world))
    }

    async fn perform_load(&self, world: &Arc<World>) -> OpOutcome {
        match world.manager.load(world.database.as_ref()).await {
            Ok(count) => {
                world.loaded.store(true, Ordering::Release);
                self.failing_loads.remove(&world.name);
                info!(world = %world.name, regions = count, "✅ Loaded region data");
                OpOutcome::Completed
            }
            Err(e) => {
                if self.is_registered(world) {
                    self.failing_loads.insert(world.name.clone());
                }
                warn!(
                    world = %world.name,
                    store = %world.database.name(),
                    "⚠️ Failed to load region data (periodic attempts will be made until success): {}",
                    e
                );
                OpOutcome::Failed(Arc::new(e))
            }
        }
    }

    async fn perform_save(&self, world: &Arc<World>) -> OpOutcome {
        if !world.is_loaded() {
            debug!(world = %world.name, "Nothing to save, region data was never loaded");
            return OpOutcome::Completed;
        }
        match world.manager.save_changes(world.database.as_ref()).await {
            Ok(wrote) => {
                self.failing_saves.remove(&world.name);
                if wrote {
                    info!(world = %world.name, "💾 Region data changes saved");
                }
                OpOutcome::Completed
            }
            Err(e) => {
                if self.is_registered(world) {
                    self.failing_saves.insert(world.name.clone());
                }
                warn!(
                    world = %world.name,
                    store = %world.database.name(),
                    "⚠️ Failed to save region data: {}",
                    e
                );
                OpOutcome::Failed(Arc::new(e))
            }
        }
    }
}

async fn run_op(state: Arc<ContainerState>, world: Arc<World>, kind: OpKind, id: u64, voided: Arc<AtomicBool>) -> OpOutcome {
    let outcome = {
        let _io = world.io_lock.lock().await;
        if voided.load(Ordering::Acquire) {
            debug!(world = %world.name, op = ?kind, "Skipping voided operation");
            OpOutcome::Voided
        } else {
            match kind {
                OpKind::Load => state.perform_load(&world).await,
                OpKind::Save => state.perform_save(&world).await,
            }
        }
    };
    world.finish(kind, id);
    outcome
}

/// Region managers for every known world.
#[derive(Clone)]
pub struct RegionContainer {
    state: Arc<ContainerState>,
}

impl std::fmt::Debug for RegionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionContainer")
            .field("driver", &self.state.driver.name())
            .field("worlds", &self.state.worlds.len())
            .finish_non_exhaustive()
    }
}

impl RegionContainer {
    pub fn new(driver: Arc<dyn RegionDriver>, registry: Arc<FlagRegistry>, config: ContainerConfig) -> Self {
        Self {
            state: Arc::new(ContainerState {
                driver,
                registry,
                config,
                worlds: DashMap::new(),
                failing_loads: DashSet::new(),
                failing_saves: DashSet::new(),
                next_op: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<FlagRegistry> {
        &self.state.registry
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.state.config
    }

    /// Manager for `world`, once its data has loaded successfully.
    pub fn get(&self, world: &str) -> Option<Arc<RegionManager>> {
        self.state
            .worlds
            .get(&normalize_id(world))
            .filter(|w| w.is_loaded())
            .map(|w| Arc::clone(&w.manager))
    }

    /// Like [`RegionContainer::get`], as an error when the world is missing.
    pub fn manager(&self, world: &str) -> Result<Arc<RegionManager>, ContainerError> {
        self.get(world)
            .ok_or_else(|| ContainerError::NotLoaded(normalize_id(world)))
    }

    /// Names of the worlds with loaded data, sorted.
    pub fn loaded_worlds(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .worlds
            .iter()
            .filter(|w| w.is_loaded())
            .map(|w| w.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Worlds whose last load failed and will be retried.
    pub fn failing_loads(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.failing_loads.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    /// Worlds whose last save failed and will be retried.
    pub fn failing_saves(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.failing_saves.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    fn world(&self, name: &str) -> Arc<World> {
        let name = normalize_id(name);
        let state = &self.state;
        state
            .worlds
            .entry(name.clone())
            .or_insert_with(|| {
                debug!(world = %name, driver = %state.driver.name(), "Registering world");
                Arc::new(World {
                    manager: Arc::new(RegionManager::new(
                        &name,
                        state.config.index_kind,
                        Arc::clone(&state.registry),
                    )),
                    database: state.driver.database(&name),
                    name: name.clone(),
                    loaded: AtomicBool::new(false),
                    io_lock: tokio::sync::Mutex::new(()),
                    pending: std::sync::Mutex::new(Pending::default()),
                })
            })
            .value()
            .clone()
    }

    fn schedule(&self, world: &Arc<World>, kind: OpKind) -> OpHandle {
        let mut pending = world.pending();

        if let Some(op) = pending.slot(kind).as_ref() {
            debug!(world = %world.name, op = ?kind, "Attaching to pending operation");
            return op.handle.clone();
        }
        if let Some(other) = pending.slot(kind.opposite()).take() {
            debug!(world = %world.name, voided = ?kind.opposite(), by = ?kind, "Voiding pending operation");
            other.void();
        }

        let id = self.state.next_op.fetch_add(1, Ordering::Relaxed);
        let voided = Arc::new(AtomicBool::new(false));
        let (void_tx, void_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(run_op(
            Arc::clone(&self.state),
            Arc::clone(world),
            kind,
            id,
            Arc::clone(&voided),
        ));

        let handle = async move {
            tokio::select! {
                biased;
                Ok(()) = void_rx => OpOutcome::Voided,
                joined = task => joined.unwrap_or_else(|e| {
                    OpOutcome::Failed(Arc::new(StorageError::Unavailable(format!("operation task failed: {e}"))))
                }),
            }
        }
        .boxed()
        .shared();

        *pending.slot(kind) = Some(PendingOp {
            id,
            handle: handle.clone(),
            void_tx,
            voided,
        });
        handle
    }

    /// Starts loading `world`, or attaches to a load already in flight.
    ///
    /// Registers the world on first use. A pending save is voided. Must be
    /// called from within a Tokio runtime.
    pub fn request_load(&self, world: &str) -> OpHandle {
        let world = self.world(world);
        self.schedule(&world, OpKind::Load)
    }

    /// Starts saving `world`'s pending changes, or attaches to a save in
    /// flight. A pending load is voided.
    pub fn request_save(&self, world: &str) -> Result<OpHandle, ContainerError> {
        let name = normalize_id(world);
        let entry = self.state.worlds.get(&name).map(|w| Arc::clone(w.value()));
        match entry {
            Some(entry) if entry.is_loaded() => Ok(self.schedule(&entry, OpKind::Save)),
            _ => Err(ContainerError::NotLoaded(name)),
        }
    }

    /// Loads `world` and waits for the outcome.
    pub async fn load(&self, world: &str) -> OpOutcome {
        self.request_load(world).await
    }

    /// Reads `world` from its store again, replacing the in-memory regions.
    pub async fn reload(&self, world: &str) -> OpOutcome {
        info!(world = %normalize_id(world), "🔄 Reloading region data");
        self.load(world).await
    }

    /// Saves `world`'s pending changes and waits for the outcome.
    pub async fn save(&self, world: &str) -> Result<(), ContainerError> {
        self.request_save(world)?.await.into_result(world)
    }

    /// Saves every loaded world concurrently.
    pub async fn save_all(&self) -> Vec<(String, OpOutcome)> {
        let names = self.loaded_worlds();
        let handles: Vec<_> = names
            .iter()
            .filter_map(|name| self.request_save(name).ok().map(|h| (name.clone(), h)))
            .collect();
        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            results.push((name, handle.await));
        }
        results
    }

    /// Saves then forgets `world`. Returns whether the world was known.
    pub async fn unload(&self, world: &str) -> bool {
        let name = normalize_id(world);
        let entry = self.state.worlds.get(&name).map(|w| Arc::clone(w.value()));
        let Some(entry) = entry else {
            self.state.failing_loads.remove(&name);
            return false;
        };

        match self.schedule(&entry, OpKind::Save).await {
            OpOutcome::Completed => {}
            OpOutcome::Failed(e) => warn!(world = %name, "⚠️ Failed to save region data while unloading: {}", e),
            OpOutcome::Voided => warn!(world = %name, "⚠️ Save while unloading was superseded by a load"),
        }

        self.state.worlds.remove_if(&name, |_, current| Arc::ptr_eq(current, &entry));
        self.state.failing_loads.remove(&name);
        self.state.failing_saves.remove(&name);
        info!(world = %name, "📤 Unloaded region data");
        true
    }

    /// Saves and forgets every world.
    pub async fn unload_all(&self) {
        let names: Vec<String> = self.state.worlds.iter().map(|w| w.key().clone()).collect();
        futures::future::join_all(names.iter().map(|name| self.unload(name))).await;
        self.state.failing_loads.clear();
        self.state.failing_saves.clear();
    }

    /// Saves loaded worlds that are dirty or whose last save failed.
    /// Returns the number of worlds saved.
    pub async fn background_save_pass(&self) -> usize {
        let worlds: Vec<Arc<World>> = self
            .state
            .worlds
            .iter()
            .filter(|w| w.is_loaded())
            .map(|w| Arc::clone(w.value()))
            .collect();

        let mut saved = 0;
        for world in worlds {
            let retry = self.state.failing_saves.contains(&world.name);
            if !retry && !world.manager.is_dirty().await {
                continue;
            }
            if self.schedule(&world, OpKind::Save).await.is_completed() {
                saved += 1;
            }
        }
        saved
    }

    /// Retries worlds whose load failed, stopping at the first that still
    /// fails. Returns the number of worlds loaded.
    pub async fn background_load_pass(&self) -> usize {
        let names = self.failing_loads();
        if names.is_empty() {
            return 0;
        }

        info!("🔄 Attempting to load region data that previously failed to load...");
        let mut loaded = 0;
        for name in names {
            match self.load(&name).await {
                OpOutcome::Completed => loaded += 1,
                OpOutcome::Voided => {}
                OpOutcome::Failed(_) => {
                    warn!(world = %name, "⚠️ Region data is still failing to load");
                    break;
                }
            }
        }
        loaded
    }

    /// Starts the periodic saver.
    pub fn spawn_background_saver(&self, shutdown: ShutdownState) -> JoinHandle<()> {
        let container = self.clone();
        let period = self.state.config.save_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = ticker.tick() => {
                        container.background_save_pass().await;
                    }
                }
            }
            debug!("Background region saver stopped");
        })
    }

    /// Starts the periodic retry of failed loads.
    pub fn spawn_background_loader(&self, shutdown: ShutdownState) -> JoinHandle<()> {
        let container = self.clone();
        let period = self.state.config.load_retry_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = ticker.tick() => {
                        container.background_load_pass().await;
                    }
                }
            }
            debug!("Background region loader stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use region_core::{BlockVector3, Geometry, Region};

    fn container(driver: &Arc<MemoryDriver>) -> RegionContainer {
        let driver: Arc<dyn RegionDriver> = driver.clone();
        RegionContainer::new(driver, Arc::new(FlagRegistry::with_defaults()), ContainerConfig::default())
    }

    fn region(id: &str) -> Region {
        Region::new(id, Geometry::cuboid(BlockVector3::new(0, 0, 0), BlockVector3::new(10, 10, 10))).unwrap()
    }

    #[tokio::test]
    async fn test_load_and_get() {
        let driver = Arc::new(MemoryDriver::new());
        driver.world("overworld").save_all(&[region("spawn")]).await.unwrap();
        let container = container(&driver);

        assert!(container.get("Overworld").is_none());
        assert!(container.load("Overworld").await.is_completed());

        let manager = container.get("overworld").unwrap();
        assert!(manager.contains("spawn").await);
        assert_eq!(container.loaded_worlds(), vec!["overworld".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_loads_attach() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("w");
        db.set_delay(Duration::from_millis(20));
        let container = container(&driver);

        let a = container.request_load("w");
        let b = container.request_load("W");
        let (a, b) = futures::join!(a, b);
        assert!(a.is_completed());
        assert!(b.is_completed());
        assert_eq!(db.load_count(), 1);
    }

    #[tokio::test]
    async fn test_load_voids_unstarted_save() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("w");
        let container = container(&driver);
        assert!(container.load("w").await.is_completed());

        container.get("w").unwrap().add_region(region("fresh")).await;
        let save = container.request_save("w").unwrap();
        let load = container.request_load("w");

        assert!(matches!(save.await, OpOutcome::Voided));
        assert!(load.await.is_completed());
        assert_eq!(db.save_count(), 0);
        assert!(!container.get("w").unwrap().contains("fresh").await);
    }

    #[tokio::test]
    async fn test_started_save_finishes_before_superseding_load() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("w");
        let container = container(&driver);
        assert!(container.load("w").await.is_completed());

        container.get("w").unwrap().add_region(region("fresh")).await;
        db.set_delay(Duration::from_millis(30));
        let save = container.request_save("w").unwrap();
        while db.save_count() == 0 {
            tokio::task::yield_now().await;
        }

        let load = container.request_load("w");
        assert!(matches!(save.await, OpOutcome::Voided));
        assert!(load.await.is_completed());

        assert_eq!(db.snapshot().await.len(), 1);
        assert!(container.get("w").unwrap().contains("fresh").await);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_in_background() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("nether");
        db.set_fail_loads(true);
        let container = container(&driver);

        assert!(matches!(container.load("nether").await, OpOutcome::Failed(_)));
        assert!(container.get("nether").is_none());
        assert!(matches!(container.manager("nether"), Err(ContainerError::NotLoaded(_))));
        assert!(matches!(container.save("nether").await, Err(ContainerError::NotLoaded(_))));
        assert_eq!(container.failing_loads(), vec!["nether".to_string()]);

        assert_eq!(container.background_load_pass().await, 0);

        db.set_fail_loads(false);
        assert_eq!(container.background_load_pass().await, 1);
        assert!(container.get("nether").is_some());
        assert!(container.failing_loads().is_empty());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_serving_old_data() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("w");
        db.save_all(&[region("old")]).await.unwrap();
        let container = container(&driver);
        assert!(container.load("w").await.is_completed());

        db.set_fail_loads(true);
        assert!(matches!(container.reload("w").await, OpOutcome::Failed(_)));
        let manager = container.get("w").unwrap();
        assert!(manager.contains("old").await);
    }

    #[tokio::test]
    async fn test_failed_save_is_retried_in_background() {
        let driver = Arc::new(MemoryDriver::new());
        let db = driver.world("w");
        let container = container(&driver);
        assert!(container.load("w").await.is_completed());

        assert_eq!(container.background_save_pass().await, 0);

        container.get("w").unwrap().add_region(region("plot")).await;
        db.set_fail_saves(true);
        assert_eq!(container.background_save_pass().await, 0);
        assert_eq!(container.failing_saves(), vec!["w".to_string()]);

        db.set_fail_saves(false);
        assert_eq!(container.background_save_pass().await, 1);
        assert!(container.failing_saves().is_empty());
        assert_eq!(db.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unload_saves_and_forgets() {
        let driver = Arc::new(MemoryDriver::new());
        let container = container(&driver);
        assert!(container.load("a").await.is_completed());
        assert!(container.load("b").await.is_completed());

        container.get("a").unwrap().add_region(region("one")).await;
        container.get("b").unwrap().add_region(region("two")).await;

        assert!(container.unload("a").await);
        assert!(container.get("a").is_none());
        assert_eq!(driver.world("a").snapshot().await.len(), 1);
        assert!(!container.unload("a").await);

        container.unload_all().await;
        assert!(container.loaded_worlds().is_empty());
        assert_eq!(driver.world("b").snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_all_reports_each_world() {
        let driver = Arc::new(MemoryDriver::new());
        let container = container(&driver);
        container.load("a").await;
        container.load("b").await;
        driver.world("b").set_fail_saves(true);
        container.get("b").unwrap().add_region(region("x")).await;

        let results = container.save_all().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_completed());
        assert!(matches!(results[1].1, OpOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_background_tasks_stop_on_shutdown() {
        let driver = Arc::new(MemoryDriver::new());
        let container = RegionContainer::new(
            driver.clone(),
            Arc::new(FlagRegistry::with_defaults()),
            ContainerConfig {
                save_interval: Duration::from_millis(10),
                load_retry_interval: Duration::from_millis(10),
                ..ContainerConfig::default()
            },
        );
        assert!(container.load("w").await.is_completed());
        container.get("w").unwrap().add_region(region("auto")).await;

        let shutdown = ShutdownState::new();
        let saver = container.spawn_background_saver(shutdown.clone());
        let loader = container.spawn_background_loader(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(driver.world("w").snapshot().await.len(), 1);

        shutdown.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(1), saver).await.unwrap().unwrap();
        tokio::time::timeout(Duration::from_secs(1), loader).await.unwrap().unwrap();
    }
}
