// crates/iac-forge-core/tests/dns_scenario.rs
// ============================================================================
// Module: DNS End-to-End Tests
// Description: DNS instance, zone, record, and custom resolver lifecycles.
// Purpose: Exercise sibling, field, and global reference scopes together.
// ============================================================================
//! ## Overview
//! Builds a DNS instance with child zones, records, and resolvers, then
//! renames and deletes the records they point at.

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
use common::lookup;
use common::record;
use common::store;
use iac_forge_core::ConfigStore;
use iac_forge_core::OpContext;
use iac_forge_core::ResourceKind;
use serde_json::Value;
use serde_json::json;

fn dev_instance() -> Result<ConfigStore, String> {
    let store = store();
    store
        .create(
            ResourceKind::Dns,
            record(json!({"name": "dev", "resource_group": "service-rg", "plan": "standard"})),
            &OpContext::new(),
        )
        .map_err(|error| error.to_string())?;
    store
        .create(ResourceKind::DnsZones, record(json!({"name": "zone"})), &OpContext::new().under("dev"))
        .map_err(|error| error.to_string())?;
    Ok(store)
}

#[test]
fn zone_save_drops_unknown_vpcs() -> TestResult {
    let store = dev_instance()?;
    let zone = lookup(&store, ResourceKind::DnsZones, Some("dev"), "zone").ok_or("zone missing")?;
    assert_eq!(zone, record(json!({"name": "zone", "instance": "dev"})));

    store
        .save(
            ResourceKind::DnsZones,
            record(json!({"name": "zzzz", "vpcs": ["frog", "toad"]})),
            &OpContext::editing("zone").under("dev"),
        )
        .map_err(|error| error.to_string())?;
    let zone = lookup(&store, ResourceKind::DnsZones, Some("dev"), "zzzz").ok_or("zone missing")?;
    assert_eq!(zone, record(json!({"name": "zzzz", "instance": "dev", "vpcs": []})));
    Ok(())
}

#[test]
fn custom_resolver_subnets_follow_their_vpc() -> TestResult {
    let store = dev_instance()?;
    let under_dev = OpContext::new().under("dev");
    store
        .create(
            ResourceKind::DnsCustomResolvers,
            record(json!({"name": "resolver", "vpc": null, "subnets": [], "zone": null})),
            &under_dev,
        )
        .map_err(|error| error.to_string())?;

    let editing = OpContext::editing("resolver").under("dev");
    store
        .save(
            ResourceKind::DnsCustomResolvers,
            record(json!({"vpc": "bad", "subnets": ["vsi-zone-1"]})),
            &editing,
        )
        .map_err(|error| error.to_string())?;
    let resolver = lookup(&store, ResourceKind::DnsCustomResolvers, Some("dev"), "resolver")
        .ok_or("resolver missing")?;
    assert_eq!(
        resolver,
        record(json!({
            "name": "resolver",
            "instance": "dev",
            "vpc": null,
            "subnets": [],
            "zone": null
        }))
    );

    store
        .save(
            ResourceKind::DnsCustomResolvers,
            record(json!({
                "vpc": "management",
                "subnets": ["vsi-zone-1", "frog", "vpn-zone-1"],
                "zone": "zone"
            })),
            &editing,
        )
        .map_err(|error| error.to_string())?;
    let resolver = lookup(&store, ResourceKind::DnsCustomResolvers, Some("dev"), "resolver")
        .ok_or("resolver missing")?;
    assert_eq!(resolver["subnets"], json!(["vsi-zone-1", "vpn-zone-1"]));
    assert_eq!(resolver["zone"], json!("zone"));

    store
        .delete(ResourceKind::Subnets, &OpContext::editing("vpn-zone-1").under("management"))
        .map_err(|error| error.to_string())?;
    store
        .delete(ResourceKind::Subnets, &OpContext::editing("vsi-zone-1").under("workload"))
        .map_err(|error| error.to_string())?;
    let resolver = lookup(&store, ResourceKind::DnsCustomResolvers, Some("dev"), "resolver")
        .ok_or("resolver missing")?;
    assert_eq!(resolver["subnets"], json!(["vsi-zone-1"]));

    store
        .delete(ResourceKind::Vpcs, &OpContext::editing("management"))
        .map_err(|error| error.to_string())?;
    let resolver = lookup(&store, ResourceKind::DnsCustomResolvers, Some("dev"), "resolver")
        .ok_or("resolver missing")?;
    assert_eq!(resolver["vpc"], Value::Null);
    assert_eq!(resolver["subnets"], json!([]));
    assert_eq!(resolver["zone"], json!("zone"));
    Ok(())
}

#[test]
fn zone_rename_reaches_records_of_the_same_instance_only() -> TestResult {
    let store = dev_instance()?;
    store
        .create(
            ResourceKind::Dns,
            record(json!({"name": "prod", "resource_group": "service-rg", "plan": "standard"})),
            &OpContext::new(),
        )
        .map_err(|error| error.to_string())?;
    for instance in ["dev", "prod"] {
        store
            .create(
                ResourceKind::DnsRecords,
                record(json!({"name": "web", "type": "A", "dns_zone": "zone", "rdata": "10.0.0.1"})),
                &OpContext::new().under(instance),
            )
            .map_err(|error| error.to_string())?;
    }
    store
        .save(
            ResourceKind::DnsZones,
            record(json!({"name": "internal"})),
            &OpContext::editing("zone").under("dev"),
        )
        .map_err(|error| error.to_string())?;

    let dev = lookup(&store, ResourceKind::DnsRecords, Some("dev"), "web").ok_or("record missing")?;
    let prod = lookup(&store, ResourceKind::DnsRecords, Some("prod"), "web").ok_or("record missing")?;
    assert_eq!(dev["dns_zone"], json!("internal"));
    assert_eq!(prod["dns_zone"], json!("zone"));

    store
        .delete(ResourceKind::DnsZones, &OpContext::editing("internal").under("dev"))
        .map_err(|error| error.to_string())?;
    let dev = lookup(&store, ResourceKind::DnsRecords, Some("dev"), "web").ok_or("record missing")?;
    assert_eq!(dev["dns_zone"], Value::Null);
    Ok(())
}

#[test]
fn deleting_an_instance_removes_its_children() -> TestResult {
    let store = dev_instance()?;
    store.delete(ResourceKind::Dns, &OpContext::editing("dev")).map_err(|error| error.to_string())?;
    let remaining = store
        .read(|tree| tree.names(ResourceKind::DnsZones, None).len())
        .map_err(|error| error.to_string())?;
    assert_eq!(remaining, 0);
    Ok(())
}
