// crates/iac-forge-core/src/reference.rs
// ============================================================================
// Module: Reference Resolution Helpers
// Description: Name-based lookups across collections of the configuration tree.
// Purpose: Translate human-entered names into the records they denote.
// Dependencies: crate::{kind, tree}
// ============================================================================

//! ## Overview
//! Relationship fields store the *name* of their target. These helpers find
//! the target by name, first match in insertion order. Absence is reported as
//! `None`; the store turns that into a null field while the generator turns
//! it into a visible error marker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::kind::ResourceKind;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::record_name;

// ============================================================================
// SECTION: Lookups
// ============================================================================

/// Returns the first record whose `name` equals `name`.
#[must_use]
pub fn find_by_name<'a, I>(records: I, name: &str) -> Option<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().find(|record| record_name(record) == Some(name))
}

/// Looks up a record of `kind` by name, optionally scoped to a parent.
#[must_use]
pub fn find<'a>(
    tree: &'a ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> Option<&'a Record> {
    find_by_name(tree.collection(kind, parent), name)
}

/// Returns true when a record of `kind` named `name` exists.
#[must_use]
pub fn record_exists(
    tree: &ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> bool {
    find(tree, kind, parent, name).is_some()
}

/// Returns true when the referenced record has `use_data` set.
///
/// Unfound records are treated as managed resources.
#[must_use]
pub fn uses_data(tree: &ConfigTree, kind: ResourceKind, name: &str) -> bool {
    find(tree, kind, None, name)
        .and_then(|record| record.get("use_data"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;

    use super::*;

    fn sample() -> ConfigTree {
        match json!({
            "resource_groups": [
                {"name": "service-rg", "use_data": true},
                {"name": "service-rg", "use_data": false},
                {"name": "workload-rg"}
            ]
        }) {
            Value::Object(map) => ConfigTree::from_map(map),
            _ => ConfigTree::new(),
        }
    }

    #[test]
    fn first_match_wins() {
        let tree = sample();
        assert!(uses_data(&tree, ResourceKind::ResourceGroups, "service-rg"));
    }

    #[test]
    fn missing_records_are_none() {
        let tree = sample();
        assert!(find(&tree, ResourceKind::ResourceGroups, None, "frog").is_none());
        assert!(!record_exists(&tree, ResourceKind::Vpcs, None, "management"));
        assert!(!uses_data(&tree, ResourceKind::ResourceGroups, "frog"));
    }
}
