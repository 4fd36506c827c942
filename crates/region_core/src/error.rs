//! Error types for the region engine.
//!
//! Every failure here is recoverable: callers either reject the offending
//! command or drop the offending piece of loaded data and carry on.

use crate::geometry::GeometryKind;

/// Errors raised by region, flag and index operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    /// Assigning the parent would make the region its own ancestor
    #[error("Circular inheritance: setting parent of '{child}' to '{parent}' would create a cycle")]
    CircularInheritance { child: String, parent: String },

    /// Two geometry kinds have no overlap test between them
    #[error("Unsupported intersection between {0:?} and {1:?} geometry")]
    UnsupportedIntersection(GeometryKind, GeometryKind),

    /// The global region has no place in a parent chain
    #[error("The global region cannot be a parent or a child (region '{0}')")]
    GlobalInheritance(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Invalid region id: {0}")]
    InvalidRegionId(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A value does not fit the flag's declared type
    #[error("Invalid value for flag '{flag}': {reason}")]
    InvalidFlagValue { flag: String, reason: String },

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Flag already registered: {0}")]
    FlagConflict(String),

    #[error("Invalid region group: {0}")]
    InvalidGroup(String),
}

impl RegionError {
    pub(crate) fn invalid_value(flag: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFlagValue {
            flag: flag.to_string(),
            reason: reason.into(),
        }
    }
}
