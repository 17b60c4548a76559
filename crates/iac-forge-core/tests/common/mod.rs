// crates/iac-forge-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Helpers
// Description: Shared fixtures for store and schema integration tests.
// Purpose: Build stores, records, and observers with minimal boilerplate.
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use iac_forge_core::ConfigStore;
use iac_forge_core::ConfigTree;
use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::find;
use serde_json::Value;

/// Result type for integration tests.
pub type TestResult = Result<(), String>;

/// Unwraps a JSON object literal into a record.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Wraps a JSON object literal as a tree.
pub fn tree(value: Value) -> ConfigTree {
    ConfigTree::from_map(record(value))
}

/// Creates a store holding the default tree.
pub fn store() -> ConfigStore {
    ConfigStore::new().expect("schema registry is consistent")
}

/// Registers a counting observer and returns the counter.
pub fn count_updates(store: &ConfigStore) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&calls);
    store
        .set_update_callback(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        })
        .expect("callback registered");
    calls
}

/// Reads the current update count.
pub fn updates(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}

/// Returns a copy of the named record from a store snapshot.
pub fn lookup(
    store: &ConfigStore,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> Option<Record> {
    store.read(|tree| find(tree, kind, parent, name).cloned()).expect("store readable")
}

/// Returns a copy of a singleton record.
pub fn singleton(store: &ConfigStore, kind: ResourceKind) -> Record {
    store
        .read(|tree| tree.singleton(kind).cloned())
        .expect("store readable")
        .unwrap_or_default()
}
