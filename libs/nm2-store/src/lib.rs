//! NM2 state store abstraction
//!
//! Flat key-value store the telemetry bridge publishes into. The real
//! consumer (a NUT-style `dstate` table) lives outside this workspace; the
//! in-memory backend stands in for it.
//!
//! # Key Components
//!
//! - **StateStore trait**: get / set / del plus prefix scans and batches
//! - **MemoryStore**: DashMap backend with write counters
//! - **numfmt**: canonical integer and two-decimal formatting

pub mod error;

pub mod memory_impl;

pub mod numfmt;

pub mod traits;

// Re-exports
pub use error::{Result, StoreError};
pub use memory_impl::{MemoryStats, MemoryStore};
pub use traits::StateStore;

/// Helper functions for common operations
pub mod helpers {
    use super::{MemoryStore, StateStore};
    use std::sync::Arc;

    // ==================== Test Support ====================

    /// Create an in-memory store behind the trait object
    ///
    /// # Example
    /// ```
    /// use nm2_store::helpers::create_test_store;
    ///
    /// let store = create_test_store();
    /// store.set("ups.status", "OL").unwrap();
    /// ```
    pub fn create_test_store() -> Arc<dyn StateStore> {
        Arc::new(MemoryStore::new())
    }

    /// Create a concrete MemoryStore for tests that inspect counters
    pub fn create_test_memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }
}
