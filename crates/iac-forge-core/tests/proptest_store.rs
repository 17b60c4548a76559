// crates/iac-forge-core/tests/proptest_store.rs
// ============================================================================
// Module: Store Property-Based Tests
// Description: Randomized mutation sequences against the configuration store.
// Purpose: Show sibling names stay unique and fixup is idempotent.
// ============================================================================
//! ## Overview
//! Generates sequences of creates, renames, and deletes over a small name
//! pool so collisions and dangling references are frequent.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use common::record;
use common::store;
use common::tree;
use iac_forge_core::ConfigStore;
use iac_forge_core::OpContext;
use iac_forge_core::ResourceKind;
use iac_forge_core::fixup::reconcile_all;
use proptest::prelude::*;
use serde_json::json;

const NAMES: [&str; 5] = ["alpha", "beta", "gamma", "service-rg", "workload-rg"];

#[derive(Debug, Clone)]
enum Mutation {
    Create(usize),
    Rename(usize, usize),
    Delete(usize),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0 .. NAMES.len()).prop_map(Mutation::Create),
        (0 .. NAMES.len(), 0 .. NAMES.len()).prop_map(|(from, to)| Mutation::Rename(from, to)),
        (0 .. NAMES.len()).prop_map(Mutation::Delete),
    ]
}

fn apply(store: &ConfigStore, kind: ResourceKind, mutation: &Mutation) {
    let _ = match *mutation {
        Mutation::Create(name) => {
            store.create(kind, record(json!({"name": NAMES[name]})), &OpContext::new())
        }
        Mutation::Rename(from, to) => store.save(
            kind,
            record(json!({"name": NAMES[to]})),
            &OpContext::editing(NAMES[from]),
        ),
        Mutation::Delete(name) => store.delete(kind, &OpContext::editing(NAMES[name])),
    };
}

proptest! {
    #[test]
    fn sibling_names_stay_unique(mutations in prop::collection::vec(mutation(), 0 .. 40)) {
        let store = store();
        for mutation in &mutations {
            apply(&store, ResourceKind::ResourceGroups, mutation);
        }
        let names: Vec<String> = store
            .read(|tree| {
                tree.names(ResourceKind::ResourceGroups, None)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap();
        let unique: BTreeSet<&String> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn references_never_dangle_after_mutations(
        mutations in prop::collection::vec(mutation(), 0 .. 30),
    ) {
        let store = store();
        for (index, name) in NAMES.iter().enumerate().take(3) {
            let group = if index % 2 == 0 { "service-rg" } else { "workload-rg" };
            store
                .create(
                    ResourceKind::KeyManagement,
                    record(json!({"name": name, "resource_group": group})),
                    &OpContext::new(),
                )
                .unwrap();
        }
        for mutation in &mutations {
            apply(&store, ResourceKind::ResourceGroups, mutation);
        }
        let mut snapshot = store.snapshot().unwrap();
        let groups: BTreeSet<String> = snapshot
            .names(ResourceKind::ResourceGroups, None)
            .into_iter()
            .map(str::to_string)
            .collect();
        for kms in snapshot.top_level(ResourceKind::KeyManagement) {
            if let Some(group) = kms.get("resource_group").and_then(|value| value.as_str()) {
                prop_assert!(groups.contains(group));
            }
        }
        prop_assert!(!reconcile_all(&mut snapshot));
    }

    #[test]
    fn reconcile_is_idempotent(
        vpcs in prop::collection::vec(prop::sample::select(NAMES.to_vec()), 0 .. 6),
        kept in prop::sample::subsequence(NAMES.to_vec(), 0 ..= NAMES.len()),
    ) {
        let existing: Vec<_> = kept.iter().map(|name| json!({"name": name, "subnets": []})).collect();
        let mut first = tree(json!({
            "vpcs": existing,
            "dns": [{
                "name": "dev",
                "zones": [{"name": "zone", "instance": "dev", "vpcs": vpcs}],
                "records": [],
                "custom_resolvers": []
            }]
        }));
        reconcile_all(&mut first);
        let mut second = first.clone();
        prop_assert!(!reconcile_all(&mut second));
        prop_assert_eq!(first, second);
    }
}
