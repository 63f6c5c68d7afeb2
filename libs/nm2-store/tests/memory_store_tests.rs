//! Behaviour tests for the in-memory store through the trait object
//!
//! The engine only ever sees `Arc<dyn StateStore>`, so these go through the
//! same surface.

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::disallowed_methods)]

use nm2_store::helpers::{create_test_memory_store, create_test_store};
use nm2_store::StateStore;
use std::sync::Arc;
use std::thread;

// ============================================================================
// Basic Key-Value Operations
// ============================================================================

#[test]
fn test_trait_object_round_trip() {
    let store = create_test_store();
    store.set("ambient.1.name", "rack-top").unwrap();
    assert_eq!(
        store.get("ambient.1.name").unwrap().as_deref(),
        Some("rack-top")
    );
    assert!(store.exists("ambient.1.name").unwrap());
    assert!(!store.exists("ambient.2.name").unwrap());
}

#[test]
fn test_overwrite_keeps_single_entry() {
    let store = create_test_memory_store();
    store.set("ups.status", "OL").unwrap();
    store.set("ups.status", "OL OVER").unwrap();
    assert_eq!(store.stats().kv_count, 1);
    assert_eq!(store.get("ups.status").unwrap().as_deref(), Some("OL OVER"));
}

// ============================================================================
// Prefix Scans
// ============================================================================

#[test]
fn test_prefix_scan_does_not_cross_position_boundary() {
    let store = create_test_store();
    store.set("ambient.1.mfr", "EATON").unwrap();
    store.set("ambient.10.mfr", "EATON").unwrap();

    // A trailing dot keeps position 1 apart from position 10
    assert_eq!(
        store.keys_with_prefix("ambient.1.").unwrap(),
        vec!["ambient.1.mfr"]
    );
    assert_eq!(store.keys_with_prefix("ambient.1").unwrap().len(), 2);
}

// ============================================================================
// Concurrent Access
// ============================================================================

#[test]
fn test_concurrent_writers() {
    let store = create_test_memory_store();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    store
                        .set(&format!("outlet.{}.{}", t, i), "on")
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.kv_count, 400);
    assert_eq!(stats.set_calls, 400);
}
