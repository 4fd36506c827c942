//! Error types for region persistence.

use region_core::RegionError;
use std::sync::Arc;

/// Errors raised while loading or saving region data.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store contents are not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store is readable but does not have the expected shape
    #[error("Malformed region data: {0}")]
    Malformed(String),

    /// The backing store cannot be reached right now
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Region error: {0}")]
    Core(#[from] RegionError),
}

/// Errors raised by the world container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The world has not been loaded successfully yet
    #[error("World not loaded: {0}")]
    NotLoaded(String),

    /// The operation was superseded by a conflicting one on the same world
    #[error("Operation on '{0}' was voided")]
    Voided(String),

    #[error("Storage error: {0}")]
    Storage(#[from] Arc<StorageError>),
}
