// crates/iac-forge-codegen/tests/common/mod.rs
// ============================================================================
// Module: Codegen Test Helpers
// Description: Tree fixtures shared by generator integration tests.
// Purpose: Build small trees that resolve the references under test.
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers are permitted."
)]

use iac_forge_core::ConfigTree;
use iac_forge_core::Record;
use serde_json::Value;
use serde_json::json;

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

/// Options and resource groups used by most generator fixtures.
pub fn network_tree(extra: Value) -> ConfigTree {
    let mut base = record(json!({
        "_options": {"tags": ["hello", "world"], "prefix": "iac", "region": "us-south"},
        "resource_groups": [
            {"use_prefix": true, "name": "slz-service-rg", "use_data": false},
            {"use_prefix": true, "name": "slz-management-rg", "use_data": false},
            {"use_prefix": true, "name": "service-rg", "use_data": false}
        ],
        "vpcs": [
            {"name": "management", "resource_group": "slz-management-rg", "subnets": []},
            {"name": "workload", "resource_group": "slz-management-rg", "subnets": []}
        ]
    }));
    base.extend(record(extra));
    ConfigTree::from_map(base)
}
