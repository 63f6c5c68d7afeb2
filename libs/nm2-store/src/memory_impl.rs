//! In-memory state store
//!
//! Uses DashMap for lock-free concurrent access. Backs the replay binary and
//! every test that needs to observe what the engine published.

use crate::error::{Result, StoreError};
use crate::traits::StateStore;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory store with concurrent access support
pub struct MemoryStore {
    kv_store: Arc<DashMap<String, String>>,
    counters: Arc<WriteCounters>,
}

#[derive(Debug, Default)]
struct WriteCounters {
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            kv_store: Arc::new(DashMap::new()),
            counters: Arc::new(WriteCounters::default()),
        }
    }

    /// Clear all data and reset the counters
    pub fn clear(&self) {
        self.kv_store.clear();
        self.counters.sets.store(0, Ordering::Relaxed);
        self.counters.deletes.store(0, Ordering::Relaxed);
    }

    /// Get statistics about stored data
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            kv_count: self.kv_store.len(),
            set_calls: self.counters.sets.load(Ordering::Relaxed),
            del_calls: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    /// Sorted copy of every entry
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.kv_store
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about memory store usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub kv_count: usize,
    /// Number of `set` calls since creation or the last `clear`
    pub set_calls: u64,
    /// Number of `del` calls since creation or the last `clear`
    pub del_calls: u64,
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv_store.get(key).map(|v| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::check_key(key)?;
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        self.kv_store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn del(&self, key: &str) -> Result<bool> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(self.kv_store.remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.kv_store.contains_key(key))
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .kv_store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_set_get_del() {
        let store = MemoryStore::new();
        store.set("device.mfr", "EATON").unwrap();
        assert_eq!(store.get("device.mfr").unwrap().as_deref(), Some("EATON"));
        assert!(store.exists("device.mfr").unwrap());

        assert!(store.del("device.mfr").unwrap());
        assert!(!store.del("device.mfr").unwrap());
        assert_eq!(store.get("device.mfr").unwrap(), None);
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = MemoryStore::new();
        let err = store.set("", "x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert_eq!(store.stats().set_calls, 0);
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = MemoryStore::new();
        store.set("ambient.2.name", "b").unwrap();
        store.set("ambient.1.name", "a").unwrap();
        store.set("ups.status", "OL").unwrap();

        let keys = store.keys_with_prefix("ambient.").unwrap();
        assert_eq!(keys, vec!["ambient.1.name", "ambient.2.name"]);
    }

    #[test]
    fn test_stats_and_clear() {
        let store = MemoryStore::default();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        store.del("missing").unwrap();

        let stats = store.stats();
        assert_eq!(stats.kv_count, 1);
        assert_eq!(stats.set_calls, 2);
        assert_eq!(stats.del_calls, 1);

        store.clear();
        assert_eq!(
            store.stats(),
            MemoryStats {
                kv_count: 0,
                set_calls: 0,
                del_calls: 0
            }
        );
    }

    #[test]
    fn test_batch_defaults() {
        let store = MemoryStore::new();
        store
            .set_many(&[
                ("k1".to_string(), "v1".to_string()),
                ("k2".to_string(), "v2".to_string()),
            ])
            .unwrap();
        let removed = store
            .del_many(&["k1".to_string(), "k3".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.snapshot().len(), 1);
    }
}
