use super::{defaults, Flag, FlagValue};
use crate::error::RegionError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Case-insensitive catalogue of known flags.
///
/// Stores decode persisted values through the registry; a flag missing from
/// it cannot be loaded.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    flags: BTreeMap<String, Arc<Flag>>,
}

impl FlagRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalogue.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for flag in defaults::all() {
            registry.flags.insert(flag.name().to_string(), Arc::new(flag.clone()));
        }
        registry
    }

    /// Registers a custom flag.
    ///
    /// # Errors
    ///
    /// [`RegionError::FlagConflict`] when a flag with the same name exists.
    pub fn register(&mut self, flag: Flag) -> Result<Arc<Flag>, RegionError> {
        if self.flags.contains_key(flag.name()) {
            return Err(RegionError::FlagConflict(flag.name().to_string()));
        }
        let flag = Arc::new(flag);
        self.flags.insert(flag.name().to_string(), Arc::clone(&flag));
        Ok(flag)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Flag>> {
        self.flags.get(&name.to_lowercase()).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Flag>> {
        self.flags.values()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Decodes a stored value for the named flag.
    pub fn unmarshal(&self, name: &str, raw: &Value) -> Result<(Arc<Flag>, FlagValue), RegionError> {
        let flag = self
            .get(name)
            .ok_or_else(|| RegionError::UnknownFlag(name.to_string()))?;
        let value = flag.unmarshal(raw)?;
        Ok((flag, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagKind;

    #[test]
    fn test_defaults_are_registered() {
        let registry = FlagRegistry::with_defaults();
        assert_eq!(registry.len(), defaults::all().len());
        assert!(registry.get("BUILD").is_some());
        assert!(registry.get("game-mode").is_some());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FlagRegistry::with_defaults();
        assert_eq!(
            registry.register(Flag::state("pvp")).unwrap_err(),
            RegionError::FlagConflict("pvp".into())
        );
        let custom = registry.register(Flag::new("shop-owner", FlagKind::String)).unwrap();
        assert_eq!(registry.get("Shop-Owner").as_deref(), Some(&*custom));
    }

    #[test]
    fn test_unmarshal_unknown_flag() {
        let registry = FlagRegistry::with_defaults();
        assert_eq!(
            registry.unmarshal("no-such-flag", &Value::Bool(true)).unwrap_err(),
            RegionError::UnknownFlag("no-such-flag".into())
        );
    }
}
