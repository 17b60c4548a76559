// crates/iac-forge-codegen/tests/golden.rs
// ============================================================================
// Module: Generator Golden Tests
// Description: Exact Terraform output for representative records.
// Purpose: Pin layout, alignment, naming, and reference encoding.
// ============================================================================
//! ## Overview
//! Each test renders a record or a whole family and compares it byte for
//! byte with the expected Terraform text.

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
use common::tree;
use iac_forge_codegen::Refs;
use iac_forge_codegen::generate;
use iac_forge_codegen::generate_family;
use iac_forge_codegen::network::format_address_prefix;
use iac_forge_codegen::network::format_tgw;
use iac_forge_codegen::network::format_tgw_connection;
use iac_forge_codegen::services::format_event_streams;
use serde_json::json;

const TGW_TIMEOUTS: &str = "  timeouts {\n    create = \"30m\"\n    delete = \"30m\"\n  }\n}";

#[test]
fn transit_gateway_family_renders_gateway_and_vpc_connections() -> TestResult {
    let tree = network_tree(json!({
        "transit_gateways": [{
            "name": "transit-gateway",
            "resource_group": "slz-service-rg",
            "global": false,
            "connections": [
                {"tgw": "transit-gateway", "vpc": "management"},
                {"tgw": "transit-gateway", "vpc": "workload"}
            ]
        }]
    }));
    let expected = r#"##############################################################################
# Transit Gateway Transit Gateway
##############################################################################

resource "ibm_tg_gateway" "transit_gateway" {
  name           = "${var.prefix}-transit-gateway"
  location       = var.region
  global         = false
  resource_group = ibm_resource_group.slz_service_rg.id
  timeouts {
    create = "30m"
    delete = "30m"
  }
}

resource "ibm_tg_connection" "transit_gateway_to_management_connection" {
  gateway      = ibm_tg_gateway.transit_gateway.id
  network_type = "vpc"
  name         = "${var.prefix}-transit-gateway-management-hub-connection"
  network_id   = module.management_vpc.crn
  timeouts {
    create = "30m"
    delete = "30m"
  }
}

resource "ibm_tg_connection" "transit_gateway_to_workload_connection" {
  gateway      = ibm_tg_gateway.transit_gateway.id
  network_type = "vpc"
  name         = "${var.prefix}-transit-gateway-workload-hub-connection"
  network_id   = module.workload_vpc.crn
  timeouts {
    create = "30m"
    delete = "30m"
  }
}

##############################################################################
"#;
    let actual = generate_family(&tree, "transit_gateways").ok_or("no transit gateway output")?;
    assert_eq!(actual, expected);
    Ok(())
}

#[test]
fn multiple_gateways_get_one_section_each() -> TestResult {
    let tree = network_tree(json!({
        "transit_gateways": [
            {
                "name": "transit-gateway",
                "resource_group": "service-rg",
                "global": false,
                "connections": [{"tgw": "transit-gateway", "vpc": "management"}]
            },
            {
                "global": true,
                "connections": [{"tgw": "m", "vpc": "management"}],
                "resource_group": "service-rg",
                "name": "m",
                "crns": []
            }
        ]
    }));
    let actual = generate_family(&tree, "transit_gateways").ok_or("no transit gateway output")?;
    let banner = "#".repeat(78);
    let second = format!(
        "{banner}\n\n{banner}\n# M Transit Gateway\n{banner}\n\nresource \"ibm_tg_gateway\" \"m\" {{\n  name           = \"${{var.prefix}}-m\"\n  location       = var.region\n  global         = true\n  resource_group = ibm_resource_group.service_rg.id\n"
    );
    assert!(actual.contains(&second), "second section missing:\n{actual}");
    assert!(actual.contains("resource \"ibm_tg_connection\" \"m_to_management_connection\" {\n  gateway      = ibm_tg_gateway.m.id\n"));
    assert!(actual.ends_with(&format!("}}\n\n{banner}\n")));
    Ok(())
}

#[test]
fn imported_gateway_renders_as_data_and_connections_use_it() {
    let tree = network_tree(json!({
        "transit_gateways": [{"name": "transit-gateway", "use_data": true, "connections": []}]
    }));
    let refs = Refs::new(&tree);
    let gateway = record(json!({"name": "transit-gateway", "resource_group": "slz-service-rg", "global": false, "use_data": true}));
    assert_eq!(
        format_tgw(&gateway, &refs).render(),
        "data \"ibm_tg_gateway\" \"data_transit_gateway\" {\n  name = \"transit-gateway\"\n}"
    );
    let connection = record(json!({"tgw": "transit-gateway", "vpc": "management"}));
    let rendered = format_tgw_connection(&connection, &refs).render();
    assert!(rendered.contains("  gateway      = data.ibm_tg_gateway.data_transit_gateway.id\n"));
}

#[test]
fn pinned_address_prefixes_render_per_vpc() -> TestResult {
    let tree = network_tree(json!({}));
    let refs = Refs::new(&tree);
    let vpc = record(json!({"name": "management", "resource_group": "slz-management-rg"}));
    let prefix = record(json!({"name": "vsi-zone-2", "cidr": "10.10.20.0/24", "zone": 2, "vpc": "management"}));
    let expected = r#"resource "ibm_is_vpc_address_prefix" "management_vsi_zone_2_prefix" {
  name = "${var.prefix}-management-vsi-zone-2"
  vpc  = module.management_vpc.id
  zone = "${var.region}-2"
  cidr = "10.10.20.0/24"
}"#;
    assert_eq!(format_address_prefix(&vpc, &prefix, &refs).render(), expected);

    let pinned = network_tree(json!({
        "vpcs": [{
            "name": "management",
            "resource_group": "slz-management-rg",
            "subnets": [],
            "address_prefixes": [{"name": "vsi-zone-2", "cidr": "10.10.20.0/24", "zone": 2, "vpc": "management"}]
        }]
    }));
    let section = generate_family(&pinned, "vpcs").ok_or("no vpc section")?;
    assert!(section.contains(expected), "{section}");
    let dynamic = generate_family(&network_tree(json!({})), "vpcs").ok_or("no vpc section")?;
    assert!(!dynamic.contains("ibm_is_vpc_address_prefix"));
    Ok(())
}

#[test]
fn crn_connections_use_the_vpc_id_segment() {
    let tree = network_tree(json!({}));
    let refs = Refs::new(&tree);
    let crn = "crn:v1:bluemix:public:is:us-south:a/aaaaaaa::vpc:aaaa-aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
    let connection = record(json!({"tgw": "transit-gateway", "crn": crn}));
    let expected = format!(
        "resource \"ibm_tg_connection\" \"transit_gateway_to_aaaa_aaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa_connection\" {{\n  gateway      = ibm_tg_gateway.transit_gateway.id\n  network_type = \"vpc\"\n  name         = \"${{var.prefix}}-transit-gateway-aaaa-aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa-hub-connection\"\n  network_id   = \"{crn}\"\n{TGW_TIMEOUTS}"
    );
    assert_eq!(format_tgw_connection(&connection, &refs).render(), expected);
}

#[test]
fn power_connections_target_the_workspace() {
    let tree = network_tree(json!({}));
    let refs = Refs::new(&tree);
    let connection = record(json!({"tgw": "transit-gateway", "power": "dev"}));
    let expected = format!(
        "resource \"ibm_tg_connection\" \"transit_gateway_to_power_workspace_dev_connection\" {{\n  gateway      = ibm_tg_gateway.transit_gateway.id\n  network_type = \"power_virtual_server\"\n  name         = \"${{var.prefix}}-transit-gateway-power-dev-hub-connection\"\n  network_id   = ibm_resource_instance.power_vs_workspace_dev.resource_crn\n{TGW_TIMEOUTS}"
    );
    assert_eq!(format_tgw_connection(&connection, &refs).render(), expected);
}

#[test]
fn gre_connections_use_the_classic_gateway() {
    let tree = network_tree(json!({}));
    let refs = Refs::new(&tree);
    let connection = record(json!({
        "tgw": "transit-gateway",
        "remote_bgp_asn": 12345,
        "zone": 1,
        "gateway": "gw",
        "local_tunnel_ip": "1.2.3.4",
        "remote_tunnel_ip": "1.2.3.4"
    }));
    let expected = format!(
        r#"resource "ibm_tg_connection" "transit_gateway_to_gw_unbound_gre_connection" {{
  gateway           = ibm_tg_gateway.transit_gateway.id
  network_type      = "unbound_gre_tunnel"
  name              = "${{var.prefix}}-transit-gateway-gw-unbound-gre-hub-connection"
  base_network_type = "classic"
  remote_bgp_asn    = 12345
  zone              = "${{var.region}}-1"
  local_gateway_ip  = ibm_network_gateway.classic_gateway_gw.private_ipv4_address
  remote_gateway_ip = ibm_network_gateway.classic_gateway_gw.public_ipv4_address
  local_tunnel_ip   = "1.2.3.4"
  remote_tunnel_ip  = "1.2.3.4"
{TGW_TIMEOUTS}"#
    );
    assert_eq!(format_tgw_connection(&connection, &refs).render(), expected);
}

#[test]
fn event_streams_normalize_units_and_align_parameters() -> TestResult {
    let tree = network_tree(json!({
        "event_streams": [{
            "name": "event-streams",
            "plan": "eneterprise",
            "resource_group": "slz-service-rg",
            "endpoints": "private",
            "private_ip_allowlist": ["10.0.0.0/32", "10.0.0.1/32"],
            "throughput": "150MB/s",
            "storage_size": "2TB"
        }]
    }));
    let expected = r#"##############################################################################
# Event Streams
##############################################################################

resource "ibm_resource_instance" "event_streams_es" {
  name              = "iac-event-streams"
  service           = "messagehub"
  plan              = "eneterprise"
  location          = "us-south"
  resource_group_id = ibm_resource_group.slz_service_rg.id

  parameters = {
    service-endpoints    = "private"
    private_ip_allowlist = "[10.0.0.0/32,10.0.0.1/32]"
    throughput           = "150"
    storage_size         = "2048"
  }

  timeouts {
    create = "3h"
    update = "1h"
    delete = "1h"
  }
}

##############################################################################
"#;
    let actual = generate_family(&tree, "event_streams").ok_or("no event streams output")?;
    assert_eq!(actual, expected);
    Ok(())
}

#[test]
fn event_streams_without_optional_fields_keep_only_endpoints() {
    let tree = network_tree(json!({}));
    let refs = Refs::new(&tree);
    let es = record(json!({
        "name": "event-streams",
        "plan": "eneterprise",
        "resource_group": "slz-service-rg",
        "endpoints": "private"
    }));
    let expected = r#"resource "ibm_resource_instance" "event_streams_es" {
  name              = "iac-event-streams"
  service           = "messagehub"
  plan              = "eneterprise"
  location          = "us-south"
  resource_group_id = ibm_resource_group.slz_service_rg.id

  parameters = {
    service-endpoints = "private"
  }

  timeouts {
    create = "3h"
    update = "1h"
    delete = "1h"
  }
}"#;
    assert_eq!(format_event_streams(&es, &refs).render(), expected);
}

#[test]
fn classic_sections_are_sorted_by_datacenter() -> TestResult {
    let tree = tree(json!({
        "_options": {"prefix": "iac", "region": "us-south", "tags": ["hello"]},
        "classic_ssh_keys": [
            {"name": "dev-key", "public_key": "ssh-rsa AAAA", "datacenter": "dal10"}
        ],
        "classic_vlans": [
            {"name": "vsi-vlan", "datacenter": "dal10", "type": "PUBLIC"},
            {"name": "edge-vlan", "datacenter": "ams03", "type": "PRIVATE", "router_hostname": "vsi-vlan"}
        ]
    }));
    let actual = generate_family(&tree, "classic").ok_or("no classic output")?;
    let ams = actual.find("# Ams03 VLANs").ok_or("ams03 section missing")?;
    let dal_keys = actual.find("# Dal10 SSH Keys").ok_or("dal10 keys missing")?;
    let dal_vlans = actual.find("# Dal10 VLANs").ok_or("dal10 vlans missing")?;
    assert!(ams < dal_keys && dal_keys < dal_vlans);
    assert!(!actual.contains("# Ams03 SSH Keys"));
    assert!(actual.contains(
        r#"resource "ibm_network_vlan" "classic_vlan_edge_vlan" {
  provider        = ibm.classic
  name            = "iac-edge-vlan"
  datacenter      = "ams03"
  type            = "PRIVATE"
  tags            = ["hello"]
  router_hostname = replace(ibm_network_vlan.classic_vlan_vsi_vlan.router_hostname, "b", "f")
}"#
    ));
    assert!(actual.contains(
        r#"resource "ibm_compute_ssh_key" "classic_ssh_key_dev_key" {
  provider   = ibm.classic
  label      = "dev-key"
  public_key = var.classic_dev_key_public_key
}"#
    ));
    Ok(())
}

#[test]
fn provider_adds_classic_and_power_aliases() -> TestResult {
    let tree = tree(json!({
        "_options": {
            "prefix": "iac",
            "region": "us-south",
            "enable_classic": true,
            "enable_power_vs": true,
            "power_vs_zones": ["dal10", "lon04"]
        }
    }));
    let actual = generate_family(&tree, "provider").ok_or("no provider output")?;
    let expected_tail = r#"provider "ibm" {
  alias            = "power_vs_lon04"
  ibmcloud_api_key = var.ibmcloud_api_key
  region           = "lon"
  zone             = "lon04"
  ibmcloud_timeout = 60
}"#;
    assert!(actual.starts_with(&format!("{}\n# IBM Cloud Provider\n", "#".repeat(78))));
    assert!(actual.contains(
        "provider \"ibm\" {\n  ibmcloud_api_key = var.ibmcloud_api_key\n  region           = var.region\n  ibmcloud_timeout = 60\n}"
    ));
    assert!(actual.contains("  alias                 = \"classic\"\n"));
    assert!(actual.contains("  alias            = \"power_vs_dal10\"\n"));
    assert!(actual.contains("  region           = \"us-south\"\n"));
    assert!(actual.contains(expected_tail));
    Ok(())
}

#[test]
fn unresolved_references_render_the_marker() -> TestResult {
    let tree = network_tree(json!({
        "security_groups": [{"name": "sg", "vpc": null, "resource_group": "gone", "rules": []}]
    }));
    let actual = generate(&tree).ok_or("no output")?;
    assert!(actual.contains("  vpc            = \"ERROR: Unfound Ref\"\n"));
    assert!(actual.contains("  resource_group = \"ERROR: Unfound Ref\"\n"));
    Ok(())
}
