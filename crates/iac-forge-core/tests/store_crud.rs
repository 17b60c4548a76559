// crates/iac-forge-core/tests/store_crud.rs
// ============================================================================
// Module: Store CRUD Tests
// Description: Create, save, and delete behavior of the configuration store.
// Purpose: Pin record shapes, hooks, cascades, and the notify protocol.
// ============================================================================
//! ## Overview
//! Drives [`ConfigStore`] through the mutations a form layer performs and
//! checks the resulting tree against exact expected records.

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
use common::count_updates;
use common::lookup;
use common::record;
use common::singleton;
use common::store;
use common::updates;
use iac_forge_core::OpContext;
use iac_forge_core::ResourceKind;
use iac_forge_core::StoreError;
use serde_json::Value;
use serde_json::json;

fn err(error: StoreError) -> String {
    error.to_string()
}

#[test]
fn dns_create_adds_empty_child_collections() -> TestResult {
    let store = store();
    store
        .create(
            ResourceKind::Dns,
            record(json!({"name": "dev", "resource_group": "service-rg", "plan": "standard"})),
            &OpContext::new(),
        )
        .map_err(err)?;
    let dns = lookup(&store, ResourceKind::Dns, None, "dev").ok_or("dns missing")?;
    assert_eq!(
        dns,
        record(json!({
            "name": "dev",
            "resource_group": "service-rg",
            "plan": "standard",
            "zones": [],
            "records": [],
            "custom_resolvers": []
        }))
    );
    Ok(())
}

#[test]
fn access_groups_carry_invites_and_follow_renames() -> TestResult {
    let store = store();
    store
        .create(ResourceKind::AccessGroups, record(json!({"name": "admins"})), &OpContext::new())
        .map_err(err)?;
    let group = lookup(&store, ResourceKind::AccessGroups, None, "admins").ok_or("group missing")?;
    assert_eq!(
        group,
        record(json!({
            "name": "admins",
            "policies": [],
            "dynamic_policies": [],
            "has_invites": false,
            "invites": {"group": "admins", "ibm_ids": []}
        }))
    );

    store
        .create(
            ResourceKind::AccessPolicies,
            record(json!({"name": "reader", "resources": {"resource_group": "service-rg"}})),
            &OpContext::new().under("admins"),
        )
        .map_err(err)?;
    store
        .save(
            ResourceKind::AccessGroups,
            record(json!({"name": "operators"})),
            &OpContext::editing("admins"),
        )
        .map_err(err)?;

    let group =
        lookup(&store, ResourceKind::AccessGroups, None, "operators").ok_or("renamed group missing")?;
    assert_eq!(group["invites"]["group"], json!("operators"));
    assert_eq!(group["policies"][0]["group"], json!("operators"));
    assert!(lookup(&store, ResourceKind::AccessGroups, None, "admins").is_none());
    Ok(())
}

#[test]
fn deleting_a_resource_group_nulls_nested_policy_references() -> TestResult {
    let store = store();
    store
        .create(ResourceKind::AccessGroups, record(json!({"name": "admins"})), &OpContext::new())
        .map_err(err)?;
    store
        .create(
            ResourceKind::AccessPolicies,
            record(json!({
                "name": "reader",
                "resources": {"resource_group": "management-rg", "resource_type": "resource-group"}
            })),
            &OpContext::new().under("admins"),
        )
        .map_err(err)?;
    store
        .delete(ResourceKind::ResourceGroups, &OpContext::editing("management-rg"))
        .map_err(err)?;

    let policy =
        lookup(&store, ResourceKind::AccessPolicies, Some("admins"), "reader").ok_or("policy missing")?;
    assert_eq!(
        policy["resources"],
        json!({"resource_group": null, "resource_type": "resource-group"})
    );
    let management = lookup(&store, ResourceKind::Vpcs, None, "management").ok_or("vpc missing")?;
    assert_eq!(management["resource_group"], Value::Null);
    let workload = lookup(&store, ResourceKind::Vpcs, None, "workload").ok_or("vpc missing")?;
    assert_eq!(workload["resource_group"], json!("workload-rg"));
    Ok(())
}

#[test]
fn iam_settings_reset_when_disabled() -> TestResult {
    let store = store();
    let initial = singleton(&store, ResourceKind::IamAccountSettings);
    for (field, value) in &initial {
        match field.as_str() {
            "enable" | "include_history" => assert_eq!(value, &json!(false)),
            _ => assert_eq!(value, &Value::Null, "{field} should start null"),
        }
    }

    store
        .save(
            ResourceKind::IamAccountSettings,
            record(json!({"enable": true, "mfa": "TOTP", "max_sessions_per_identity": 2})),
            &OpContext::new(),
        )
        .map_err(err)?;
    assert_eq!(singleton(&store, ResourceKind::IamAccountSettings)["mfa"], json!("TOTP"));

    store
        .save(ResourceKind::IamAccountSettings, record(json!({"enable": false})), &OpContext::new())
        .map_err(err)?;
    let settings = singleton(&store, ResourceKind::IamAccountSettings);
    assert_eq!(settings["enable"], json!(false));
    assert_eq!(settings["mfa"], Value::Null);
    assert_eq!(settings["max_sessions_per_identity"], Value::Null);
    Ok(())
}

#[test]
fn region_change_renames_atracker_location() -> TestResult {
    let store = store();
    store
        .save(ResourceKind::Options, record(json!({"region": "eu-de"})), &OpContext::new())
        .map_err(err)?;
    let atracker = singleton(&store, ResourceKind::Atracker);
    assert_eq!(atracker["locations"], json!(["global", "eu-de"]));
    assert_eq!(singleton(&store, ResourceKind::Options)["prefix"], json!("iac"));
    Ok(())
}

#[test]
fn transit_gateway_connections_follow_the_gateway_name() -> TestResult {
    let store = store();
    store
        .create(
            ResourceKind::TransitGateways,
            record(json!({
                "name": "transit-gateway",
                "resource_group": "service-rg",
                "connections": [{"tgw": "transit-gateway", "vpc": "management"}]
            })),
            &OpContext::new(),
        )
        .map_err(err)?;
    store
        .save(
            ResourceKind::TransitGateways,
            record(json!({"name": "hub"})),
            &OpContext::editing("transit-gateway"),
        )
        .map_err(err)?;
    store.delete(ResourceKind::Vpcs, &OpContext::editing("workload")).map_err(err)?;
    let tgw = lookup(&store, ResourceKind::TransitGateways, None, "hub").ok_or("tgw missing")?;
    assert_eq!(tgw["connections"], json!([{"tgw": "hub", "vpc": "management"}]));

    store.delete(ResourceKind::Vpcs, &OpContext::editing("management")).map_err(err)?;
    let tgw = lookup(&store, ResourceKind::TransitGateways, None, "hub").ok_or("tgw missing")?;
    assert_eq!(tgw["connections"], json!([]));
    Ok(())
}

#[test]
fn each_mutation_notifies_exactly_once() -> TestResult {
    let store = store();
    let calls = count_updates(&store);
    store
        .create(ResourceKind::KeyManagement, record(json!({"name": "kms"})), &OpContext::new())
        .map_err(err)?;
    assert_eq!(updates(&calls), 1);
    store
        .save(ResourceKind::KeyManagement, record(json!({"name": "hpcs"})), &OpContext::editing("kms"))
        .map_err(err)?;
    assert_eq!(updates(&calls), 2);
    store.delete(ResourceKind::KeyManagement, &OpContext::editing("hpcs")).map_err(err)?;
    assert_eq!(updates(&calls), 3);
    store.delete(ResourceKind::KeyManagement, &OpContext::editing("hpcs")).map_err(err)?;
    assert_eq!(updates(&calls), 4);
    Ok(())
}

#[test]
fn rejected_mutations_leave_the_tree_untouched() -> TestResult {
    let store = store();
    let before = store.snapshot().map_err(err)?;
    let calls = count_updates(&store);

    let duplicate = store.save(
        ResourceKind::ResourceGroups,
        record(json!({"name": "workload-rg"})),
        &OpContext::editing("service-rg"),
    );
    assert_eq!(
        duplicate,
        Err(StoreError::DuplicateName {
            kind: ResourceKind::ResourceGroups,
            name: "workload-rg".to_string(),
        })
    );
    let missing = store.save(ResourceKind::Vpcs, record(json!({"name": "x"})), &OpContext::editing("nope"));
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    let orphan = store.create(ResourceKind::Subnets, record(json!({"name": "a"})), &OpContext::new());
    assert_eq!(
        orphan,
        Err(StoreError::MissingParent {
            kind: ResourceKind::Subnets,
        })
    );
    let absent_parent = store.create(
        ResourceKind::Subnets,
        record(json!({"name": "a"})),
        &OpContext::new().under("nope"),
    );
    assert!(matches!(absent_parent, Err(StoreError::NotFound { .. })));

    assert_eq!(store.snapshot().map_err(err)?, before);
    assert_eq!(updates(&calls), 0);
    Ok(())
}

#[test]
fn renaming_a_vpc_relinks_subnets_and_rewrites_references() -> TestResult {
    let store = store();
    store
        .create(
            ResourceKind::SecurityGroups,
            record(json!({"name": "sg", "vpc": "management", "resource_group": "management-rg"})),
            &OpContext::new(),
        )
        .map_err(err)?;
    store
        .save(ResourceKind::Vpcs, record(json!({"name": "edge"})), &OpContext::editing("management"))
        .map_err(err)?;
    let edge = lookup(&store, ResourceKind::Vpcs, None, "edge").ok_or("vpc missing")?;
    let subnets = edge["subnets"].as_array().ok_or("subnets missing")?;
    assert_eq!(subnets.len(), 7);
    assert!(subnets.iter().all(|subnet| subnet["vpc"] == json!("edge")));
    let sg = lookup(&store, ResourceKind::SecurityGroups, None, "sg").ok_or("sg missing")?;
    assert_eq!(sg["vpc"], json!("edge"));
    Ok(())
}

#[test]
fn switching_object_storage_kms_clears_bucket_keys() -> TestResult {
    let store = store();
    store.reconcile_all().map_err(err)?;
    for (kms, key) in [("kms-a", "k1"), ("kms-b", "k2")] {
        store
            .create(ResourceKind::KeyManagement, record(json!({"name": kms})), &OpContext::new())
            .map_err(err)?;
        store
            .create(ResourceKind::EncryptionKeys, record(json!({"name": key})), &OpContext::new().under(kms))
            .map_err(err)?;
    }
    store
        .create(ResourceKind::ObjectStorage, record(json!({"name": "logs-cos", "kms": "kms-a"})), &OpContext::new())
        .map_err(err)?;
    store
        .create(
            ResourceKind::Buckets,
            record(json!({"name": "bkt", "kms_key": "k1"})),
            &OpContext::new().under("logs-cos"),
        )
        .map_err(err)?;

    store
        .save(ResourceKind::ObjectStorage, record(json!({"kms": "kms-b"})), &OpContext::editing("logs-cos"))
        .map_err(err)?;
    let bucket = lookup(&store, ResourceKind::Buckets, Some("logs-cos"), "bkt").ok_or("bucket missing")?;
    assert_eq!(bucket["kms_key"], Value::Null);
    assert!(!store.reconcile_all().map_err(err)?);
    Ok(())
}

#[test]
fn records_without_a_string_name_are_rejected() -> TestResult {
    let store = store();
    let before = store.snapshot().map_err(err)?;
    let calls = count_updates(&store);
    let nameless = StoreError::MissingName {
        kind: ResourceKind::ResourceGroups,
    };
    assert_eq!(
        store.create(ResourceKind::ResourceGroups, record(json!({})), &OpContext::new()),
        Err(nameless.clone())
    );
    assert_eq!(
        store.create(ResourceKind::ResourceGroups, record(json!({"name": 7})), &OpContext::new()),
        Err(nameless.clone())
    );
    assert_eq!(
        store.save(
            ResourceKind::ResourceGroups,
            record(json!({"name": null})),
            &OpContext::editing("service-rg"),
        ),
        Err(nameless)
    );
    assert_eq!(store.snapshot().map_err(err)?, before);
    assert_eq!(updates(&calls), 0);
    Ok(())
}

#[test]
fn consistent_saves_and_absent_deletes_leave_the_tree_equal() -> TestResult {
    let store = store();
    let before = store.snapshot().map_err(err)?;
    for kind in [ResourceKind::ResourceGroups, ResourceKind::Vpcs] {
        for current in before.top_level(kind) {
            let name = current["name"].as_str().ok_or("unnamed record")?;
            store.save(kind, current.clone(), &OpContext::editing(name)).map_err(err)?;
        }
    }
    for kind in [ResourceKind::Options, ResourceKind::IamAccountSettings, ResourceKind::Atracker] {
        store.save(kind, singleton(&store, kind), &OpContext::new()).map_err(err)?;
    }
    store.delete(ResourceKind::Vpcs, &OpContext::editing("absent")).map_err(err)?;
    assert_eq!(store.snapshot().map_err(err)?, before);
    Ok(())
}
