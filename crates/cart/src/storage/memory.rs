//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{KeyValueStore, StorageError};

/// Process-local store.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the cart wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn test_clones_share_values() {
        let store = MemoryStore::new();
        let observer = store.clone();

        store.set("k", "[]").unwrap();
        assert_eq!(observer.get("k").unwrap().as_deref(), Some("[]"));

        store.set("k", "[1]").unwrap();
        assert_eq!(observer.get("k").unwrap().as_deref(), Some("[1]"));
    }
}
