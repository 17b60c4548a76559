// crates/iac-forge-codegen/src/network.rs
// ============================================================================
// Module: Network Generators
// Description: Resource groups, VPCs, security groups, transit gateways, and
//              VPC SSH keys.
// Purpose: Emit the networking primitives every other resource attaches to.
// Dependencies: iac-forge-core, serde_json
// ============================================================================

//! ## Overview
//! Each `format_*` function renders one record as a [`Block`] (or a few
//! blocks) and each `*_tf` function renders every record of its kind as
//! titled sections, returning `None` when there is nothing to emit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::bool_field;
use iac_forge_core::non_empty_str;
use iac_forge_core::schema::FLOW_LOGS_DISABLED;
use iac_forge_core::str_field;
use iac_forge_core::str_list;
use serde_json::Value;

use crate::document::Block;
use crate::document::Expr;
use crate::document::Section;
use crate::document::render_sections;
use crate::document::timeouts;
use crate::naming::snake_case;
use crate::naming::title_case;
use crate::refs::Refs;
use crate::refs::record_label;
use crate::refs::subnet_label;
use crate::refs::var_prefixed;

// ============================================================================
// SECTION: Constants
// ============================================================================

const TGW_TIMEOUTS: [(&str, &str); 2] = [("create", "30m"), ("delete", "30m")];

/// Local module path that provisions a VPC.
const VPC_MODULE_SOURCE: &str = "./vpc";

// ============================================================================
// SECTION: Resource Groups
// ============================================================================

/// Formats a resource group, or its data lookup when imported.
#[must_use]
pub fn format_resource_group(group: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(group);
    if bool_field(group, "use_data") {
        return Block::data("ibm_resource_group", snake_case(name)).attr("name", Expr::str(name));
    }
    let display = if bool_field(group, "use_prefix") { var_prefixed(name) } else { Expr::str(name) };
    Block::resource("ibm_resource_group", snake_case(name))
        .attr("name", display)
        .attr("tags", refs.tags())
}

/// Resource groups section.
#[must_use]
pub fn resource_group_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs
        .tree()
        .top_level(ResourceKind::ResourceGroups)
        .into_iter()
        .map(|group| format_resource_group(group, refs))
        .collect();
    render_sections(Section::non_empty("Resource Groups", blocks))
}

// ============================================================================
// SECTION: VPCs
// ============================================================================

/// Formats the VPC module call.
#[must_use]
pub fn format_vpc(vpc: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(vpc);
    let gateway_zones: Vec<Expr> = public_gateway_zones(vpc).into_iter().map(Expr::int).collect();
    let optional_names = ["default_network_acl_name", "default_security_group_name", "default_routing_table_name"]
        .into_iter()
        .filter_map(|field| non_empty_str(vpc, field).map(|value| (field, var_prefixed(&format!("{name}-{value}")))));
    let mut block = Block::module(format!("{}_vpc", snake_case(name)))
        .attr("source", Expr::str(VPC_MODULE_SOURCE))
        .attr("name", var_prefixed(&format!("{name}-vpc")))
        .attr("region", Expr::raw("var.region"))
        .attr("resource_group_id", refs.resource_group_id(str_field(vpc, "resource_group")))
        .attr("classic_access", Expr::Bool(bool_field(vpc, "classic_access")))
        .attr("manual_address_prefix_management", Expr::Bool(bool_field(vpc, "manual_address_prefix_management")))
        .attr("public_gateway_zones", Expr::List(gateway_zones))
        .attr("tags", refs.tags());
    for (field, value) in optional_names {
        block = block.attr(field, value);
    }
    block
}

fn public_gateway_zones(vpc: &Record) -> Vec<i64> {
    let mut zones: Vec<i64> = subnets(vpc)
        .into_iter()
        .filter(|subnet| bool_field(subnet, "public_gateway"))
        .filter_map(|subnet| subnet.get("zone").and_then(Value::as_i64))
        .collect();
    zones.sort_unstable();
    zones.dedup();
    zones
}

fn subnets(vpc: &Record) -> Vec<&Record> {
    records_in(vpc, "subnets")
}

fn records_in<'a>(vpc: &'a Record, field: &str) -> Vec<&'a Record> {
    vpc.get(field)
        .and_then(Value::as_array)
        .map(|records| records.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Formats one pinned address prefix of `vpc`.
#[must_use]
pub fn format_address_prefix(vpc: &Record, prefix: &Record, refs: &Refs<'_>) -> Block {
    let vpc_name = record_label(vpc);
    let prefix_name = record_label(prefix);
    let zone = prefix.get("zone").and_then(Value::as_i64).unwrap_or(1);
    Block::resource(
        "ibm_is_vpc_address_prefix",
        format!("{}_{}_prefix", snake_case(vpc_name), snake_case(prefix_name)),
    )
    .attr("name", var_prefixed(&format!("{vpc_name}-{prefix_name}")))
    .attr("vpc", refs.vpc_module(Some(vpc_name), "id"))
    .attr("zone", Expr::str(format!("${{var.region}}-{zone}")))
    .attr("cidr", Expr::str(str_field(prefix, "cidr").unwrap_or_default()))
}

/// Formats one subnet of `vpc`.
#[must_use]
pub fn format_subnet(vpc: &Record, subnet: &Record, refs: &Refs<'_>) -> Block {
    let vpc_name = record_label(vpc);
    let subnet_name = record_label(subnet);
    let zone = subnet.get("zone").and_then(Value::as_i64).unwrap_or(1);
    let public_gateway = bool_field(subnet, "public_gateway").then(|| {
        Expr::raw(format!("module.{}_vpc.public_gateways[\"zone-{zone}\"]", snake_case(vpc_name)))
    });
    Block::resource("ibm_is_subnet", subnet_label(vpc_name, subnet_name))
        .attr("vpc", refs.vpc_module(Some(vpc_name), "id"))
        .attr("name", var_prefixed(&format!("{vpc_name}-{subnet_name}")))
        .attr("zone", Expr::str(format!("${{var.region}}-{zone}")))
        .attr("resource_group", refs.resource_group_id(str_field(vpc, "resource_group")))
        .attr("ipv4_cidr_block", Expr::str(str_field(subnet, "cidr").unwrap_or_default()))
        .attr_opt("public_gateway", public_gateway)
        .attr("tags", refs.tags())
}

/// Formats the flow logs collector when the VPC has a logging bucket.
#[must_use]
pub fn format_flow_logs(vpc: &Record, refs: &Refs<'_>) -> Option<Block> {
    let bucket = non_empty_str(vpc, "bucket").filter(|bucket| *bucket != FLOW_LOGS_DISABLED)?;
    let name = record_label(vpc);
    Some(
        Block::resource("ibm_is_flow_log", format!("{}_flow_log_collector", snake_case(name)))
            .attr("name", var_prefixed(&format!("{name}-vpc-logs")))
            .attr("target", refs.vpc_module(Some(name), "id"))
            .attr("active", Expr::Bool(true))
            .attr("storage_bucket", refs.bucket(Some(bucket), "bucket_name"))
            .attr("resource_group", refs.resource_group_id(str_field(vpc, "resource_group")))
            .attr("tags", refs.tags()),
    )
}

/// One section per VPC with its module, address prefixes, subnets, and flow
/// logs. Prefixes only exist once dynamic subnets were turned off.
#[must_use]
pub fn vpc_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::Vpcs).into_iter().map(|vpc| {
        let mut blocks = vec![format_vpc(vpc, refs)];
        blocks.extend(
            records_in(vpc, "address_prefixes")
                .into_iter()
                .map(|prefix| format_address_prefix(vpc, prefix, refs)),
        );
        blocks.extend(subnets(vpc).into_iter().map(|subnet| format_subnet(vpc, subnet, refs)));
        blocks.extend(format_flow_logs(vpc, refs));
        Section::new(title_case(&format!("{} vpc", record_label(vpc))), blocks)
    }))
}

// ============================================================================
// SECTION: Security Groups
// ============================================================================

fn security_group_label(group: &Record) -> String {
    snake_case(&format!(
        "{} vpc {} sg",
        str_field(group, "vpc").unwrap_or_default(),
        record_label(group)
    ))
}

/// Formats a security group.
#[must_use]
pub fn format_security_group(group: &Record, refs: &Refs<'_>) -> Block {
    Block::resource("ibm_is_security_group", security_group_label(group))
        .attr("name", var_prefixed(&format!("{}-sg", record_label(group))))
        .attr("vpc", refs.vpc_module(str_field(group, "vpc"), "id"))
        .attr("resource_group", refs.resource_group_id(str_field(group, "resource_group")))
        .attr("tags", refs.tags())
}

/// Formats a rule of `group`.
#[must_use]
pub fn format_security_group_rule(group: &Record, rule: &Record) -> Block {
    let group_label = security_group_label(group);
    let protocol = str_field(rule, "protocol").unwrap_or("all");
    let fields: &[&str] = match protocol {
        "tcp" | "udp" => &["port_min", "port_max"],
        "icmp" => &["type", "code"],
        _ => &[],
    };
    let settings = fields.iter().fold(Block::nested(protocol), |block, field| {
        block.attr_opt(field, rule.get(*field).filter(|value| !is_unset(value)).and_then(Expr::from_json))
    });
    Block::resource(
        "ibm_is_security_group_rule",
        format!("{group_label}_rule_{}", snake_case(record_label(rule))),
    )
    .attr("group", Expr::raw(format!("ibm_is_security_group.{group_label}.id")))
    .attr("remote", Expr::str(str_field(rule, "source").unwrap_or_default()))
    .attr("direction", Expr::str(str_field(rule, "direction").unwrap_or("inbound")))
    .block_opt((!fields.is_empty()).then_some(settings))
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// One section per security group.
#[must_use]
pub fn security_group_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::SecurityGroups).into_iter().map(|group| {
        let mut blocks = vec![format_security_group(group, refs)];
        let rules = group
            .get("rules")
            .and_then(Value::as_array)
            .map(|rules| rules.iter().filter_map(Value::as_object).collect::<Vec<_>>())
            .unwrap_or_default();
        blocks.extend(rules.into_iter().map(|rule| format_security_group_rule(group, rule)));
        Section::new(title_case(&format!("{} security group", record_label(group))), blocks)
    }))
}

// ============================================================================
// SECTION: Transit Gateways
// ============================================================================

/// Formats a transit gateway, or its data lookup when imported.
#[must_use]
pub fn format_tgw(tgw: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(tgw);
    if bool_field(tgw, "use_data") {
        return Block::data("ibm_tg_gateway", format!("data_{}", snake_case(name))).attr("name", Expr::str(name));
    }
    Block::resource("ibm_tg_gateway", snake_case(name))
        .attr("name", var_prefixed(name))
        .attr("location", Expr::raw("var.region"))
        .attr("global", Expr::Bool(bool_field(tgw, "global")))
        .attr("resource_group", refs.resource_group_id(str_field(tgw, "resource_group")))
        .block(timeouts(&TGW_TIMEOUTS))
}

/// Address of the gateway a connection belongs to.
fn gateway_ref(tgw: &str, refs: &Refs<'_>) -> Expr {
    let tgw_record = refs.lookup(ResourceKind::TransitGateways, Some(tgw));
    if tgw_record.is_some_and(|record| bool_field(record, "use_data")) {
        Expr::raw(format!("data.ibm_tg_gateway.data_{}.id", snake_case(tgw)))
    } else {
        Expr::raw(format!("ibm_tg_gateway.{}.id", snake_case(tgw)))
    }
}

/// The VPC id segment of a VPC CRN.
fn crn_vpc_id(crn: &str) -> &str {
    crn.split_once("vpc:").map_or(crn, |(_, id)| id)
}

/// Formats one connection of a transit gateway.
///
/// The variant follows the populated field: `vpc`, `crn`, `power`, or a
/// classic `gateway` for unbound GRE tunnels.
#[must_use]
pub fn format_tgw_connection(connection: &Record, refs: &Refs<'_>) -> Block {
    let tgw = str_field(connection, "tgw").unwrap_or_default();
    let connection_block = |label: String, network_type: &str, segment: &str| {
        Block::resource("ibm_tg_connection", format!("{}_to_{label}_connection", snake_case(tgw)))
            .attr("gateway", gateway_ref(tgw, refs))
            .attr("network_type", Expr::str(network_type))
            .attr("name", var_prefixed(&format!("{tgw}-{segment}-hub-connection")))
    };
    let block = if let Some(vpc) = non_empty_str(connection, "vpc") {
        connection_block(snake_case(vpc), "vpc", vpc).attr("network_id", refs.vpc_module(Some(vpc), "crn"))
    } else if let Some(crn) = non_empty_str(connection, "crn") {
        let id = crn_vpc_id(crn);
        connection_block(snake_case(id), "vpc", id).attr("network_id", Expr::str(crn))
    } else if let Some(power) = non_empty_str(connection, "power") {
        connection_block(format!("power_workspace_{}", snake_case(power)), "power_virtual_server", &format!("power-{power}"))
            .attr(
                "network_id",
                Expr::raw(format!("ibm_resource_instance.power_vs_workspace_{}.resource_crn", snake_case(power))),
            )
    } else {
        let gateway = str_field(connection, "gateway").unwrap_or_default();
        let classic = format!("ibm_network_gateway.classic_gateway_{}", snake_case(gateway));
        let zone = connection.get("zone").and_then(Value::as_i64).unwrap_or(1);
        connection_block(
            format!("{}_unbound_gre", snake_case(gateway)),
            "unbound_gre_tunnel",
            &format!("{gateway}-unbound-gre"),
        )
        .attr("base_network_type", Expr::str("classic"))
        .attr_opt("remote_bgp_asn", connection.get("remote_bgp_asn").and_then(Expr::from_json))
        .attr("zone", Expr::str(format!("${{var.region}}-{zone}")))
        .attr("local_gateway_ip", Expr::raw(format!("{classic}.private_ipv4_address")))
        .attr("remote_gateway_ip", Expr::raw(format!("{classic}.public_ipv4_address")))
        .attr_opt("local_tunnel_ip", connection.get("local_tunnel_ip").and_then(Expr::from_json))
        .attr_opt("remote_tunnel_ip", connection.get("remote_tunnel_ip").and_then(Expr::from_json))
    };
    block.block(timeouts(&TGW_TIMEOUTS))
}

/// Connections of a gateway: stored connections, then CRNs from `crns` not
/// already connected.
fn tgw_connections(tgw: &Record) -> Vec<Record> {
    let name = record_label(tgw);
    let mut connections: Vec<Record> = tgw
        .get("connections")
        .and_then(Value::as_array)
        .map(|connections| connections.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default();
    for crn in str_list(tgw, "crns") {
        let connected = connections.iter().any(|connection| str_field(connection, "crn") == Some(crn));
        if !connected {
            let mut connection = Record::new();
            connection.insert("tgw".to_string(), Value::from(name));
            connection.insert("crn".to_string(), Value::from(crn));
            connections.push(connection);
        }
    }
    connections
}

/// One section per transit gateway with its connections.
#[must_use]
pub fn tgw_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::TransitGateways).into_iter().map(|tgw| {
        let mut blocks = vec![format_tgw(tgw, refs)];
        blocks.extend(tgw_connections(tgw).iter().map(|connection| format_tgw_connection(connection, refs)));
        Section::new(format!("{} Transit Gateway", title_case(record_label(tgw))), blocks)
    }))
}

// ============================================================================
// SECTION: SSH Keys
// ============================================================================

/// Formats a VPC SSH key, or its data lookup when imported.
#[must_use]
pub fn format_ssh_key(key: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(key);
    let label = format!("{}_ssh_key", snake_case(name));
    if bool_field(key, "use_data") {
        return Block::data("ibm_is_ssh_key", label).attr("name", Expr::str(name));
    }
    Block::resource("ibm_is_ssh_key", label)
        .attr("name", var_prefixed(name))
        .attr("public_key", Expr::raw(format!("var.{}_public_key", snake_case(name))))
        .attr("resource_group", refs.resource_group_id(str_field(key, "resource_group")))
        .attr("tags", refs.tags())
}

/// VPC SSH keys section.
#[must_use]
pub fn ssh_key_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs
        .tree()
        .top_level(ResourceKind::SshKeys)
        .into_iter()
        .map(|key| format_ssh_key(key, refs))
        .collect();
    render_sections(Section::non_empty("SSH Keys", blocks))
}
