//! # Region Store
//!
//! Persistence and per-world lifecycle for the regions of [`region_core`].
//!
//! - [`RegionDatabase`] / [`RegionDriver`] - the storage interface, with
//!   [`JsonFileDatabase`] and [`MemoryDatabase`] implementations
//! - [`RegionManager`] - one world's index plus its mutation surface
//! - [`RegionContainer`] - every world, with single-flight load/save and the
//!   background saver and loader
//!
//! ## Example
//!
//! ```rust
//! use region_store::*;
//! use region_core::{BlockVector3, FlagRegistry, Geometry, Region};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = RegionContainer::new(
//!     Arc::new(MemoryDriver::new()),
//!     Arc::new(FlagRegistry::with_defaults()),
//!     ContainerConfig::default(),
//! );
//!
//! container.load("world").await.into_result("world")?;
//! let manager = container.manager("world")?;
//! manager
//!     .add_region(Region::new(
//!         "spawn",
//!         Geometry::cuboid(BlockVector3::new(-16, 0, -16), BlockVector3::new(16, 255, 16)),
//!     )?)
//!     .await;
//!
//! container.save("world").await?;
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod database;
pub mod error;
pub mod json;
pub mod manager;
pub mod memory;
pub mod record;
pub mod shutdown;

pub use container::{ContainerConfig, OpHandle, OpOutcome, RegionContainer};
pub use database::{RegionDatabase, RegionDriver};
pub use error::{ContainerError, StorageError};
pub use json::{JsonFileDatabase, JsonFileDriver};
pub use manager::RegionManager;
pub use memory::{MemoryDatabase, MemoryDriver};
pub use shutdown::ShutdownState;
