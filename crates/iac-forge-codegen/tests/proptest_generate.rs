// crates/iac-forge-codegen/tests/proptest_generate.rs
// ============================================================================
// Module: Generator Property-Based Tests
// Description: Randomized trees built through the store, then generated.
// Purpose: Show generation is deterministic and its layout is stable.
// ============================================================================
//! ## Overview
//! Records are created through [`ConfigStore`] so every generated tree is one
//! the store could actually hold.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use common::TestResult;
use common::network_tree;
use common::record;
use iac_forge_codegen::BANNER;
use iac_forge_codegen::families;
use iac_forge_codegen::generate;
use iac_forge_codegen::generate_family;
use iac_forge_core::ConfigStore;
use iac_forge_core::OpContext;
use iac_forge_core::ResourceKind;
use iac_forge_core::default_tree;
use proptest::prelude::*;
use serde_json::json;

const NAMES: [&str; 5] = ["alpha", "beta", "gamma-net", "edge", "core-2"];

fn populated_store(groups: &[usize], vpcs: &[usize]) -> ConfigStore {
    let store = ConfigStore::new().expect("schema registry is consistent");
    for index in groups {
        let _ = store.create(
            ResourceKind::ResourceGroups,
            record(json!({"name": NAMES[*index], "use_prefix": true})),
            &OpContext::new(),
        );
    }
    for index in vpcs {
        let _ = store.create(
            ResourceKind::Vpcs,
            record(json!({"name": NAMES[*index], "resource_group": NAMES[0]})),
            &OpContext::new(),
        );
    }
    store
}

proptest! {
    #[test]
    fn generation_is_deterministic(
        groups in prop::collection::vec(0 .. NAMES.len(), 0 .. 6),
        vpcs in prop::collection::vec(0 .. NAMES.len(), 0 .. 6),
    ) {
        let store = populated_store(&groups, &vpcs);
        let snapshot = store.snapshot().unwrap();
        let first = generate(&snapshot).unwrap();
        let second = generate(&store.snapshot().unwrap()).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.ends_with('\n'));
        prop_assert!(!first.ends_with("\n\n"));
        prop_assert!(first.starts_with(BANNER));
    }

    #[test]
    fn every_family_output_is_contained_in_the_document(
        vpcs in prop::collection::vec(0 .. NAMES.len(), 0 .. 4),
    ) {
        let store = populated_store(&[0], &vpcs);
        let snapshot = store.snapshot().unwrap();
        let document = generate(&snapshot).unwrap();
        for family in families() {
            if let Some(section) = generate_family(&snapshot, family) {
                prop_assert!(document.contains(section.trim_end()), "{} missing", family);
            }
        }
    }
}

#[test]
fn default_tree_generates_a_provider_first_document() -> TestResult {
    let document = generate(&default_tree()).ok_or("default tree generated nothing")?;
    assert!(document.starts_with(&format!("{BANNER}\n# IBM Cloud Provider\n{BANNER}\n")));
    assert!(document.ends_with(&format!("{BANNER}\n")));
    Ok(())
}

#[test]
fn sections_follow_pipeline_order() -> TestResult {
    let tree = network_tree(json!({
        "transit_gateways": [{"name": "hub", "resource_group": "service-rg", "connections": []}],
        "event_streams": [{"name": "es", "plan": "enterprise", "resource_group": "service-rg"}],
        "security_groups": [{"name": "edge", "vpc": "management", "resource_group": "service-rg", "rules": []}],
        "ssh_keys": [{"name": "ops", "resource_group": "service-rg"}]
    }));
    let document = generate(&tree).ok_or("no output")?;
    let titles = [
        "# IBM Cloud Provider",
        "# Resource Groups",
        "# Management VPC",
        "# Workload VPC",
        "# Edge Security Group",
        "# Hub Transit Gateway",
        "# SSH Keys",
        "# Event Streams",
    ];
    let positions: Vec<usize> = titles
        .iter()
        .map(|title| document.find(title).ok_or_else(|| format!("{title} missing")))
        .collect::<Result<_, _>>()?;
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "sections out of pipeline order");
    Ok(())
}

#[test]
fn unknown_family_renders_nothing() {
    assert!(generate_family(&default_tree(), "mainframes").is_none());
    assert_eq!(families().first().copied(), Some("provider"));
    assert_eq!(families().last().copied(), Some("atracker"));
}
