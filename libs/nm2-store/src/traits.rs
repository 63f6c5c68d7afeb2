//! Trait definitions for the state store abstraction

use crate::error::Result;

/// Flat key-value state store
///
/// Keys are dot-separated names with 1-based positional segments
/// (`ambient.2.temperature.status`). Values are already rendered strings;
/// the store never interprets them.
///
/// Implementations:
/// - `MemoryStore`: in-process backend used by the replay binary and tests
pub trait StateStore: Send + Sync + 'static {
    // ========== Basic Key-Value Operations ==========

    /// Get value by key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set value for key
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete key, returning whether it existed
    fn del(&self, key: &str) -> Result<bool>;

    /// Check if key exists
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    // ========== Scans ==========

    /// All keys starting with `prefix`, sorted
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    // ========== Batch Operations ==========

    /// Set several keys in order
    fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several keys, returning how many existed
    fn del_many(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.del(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
