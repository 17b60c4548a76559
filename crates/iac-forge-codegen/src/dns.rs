// crates/iac-forge-codegen/src/dns.rs
// ============================================================================
// Module: DNS Generator
// Description: DNS service instances, zones, permitted networks, records,
//              and custom resolvers.
// Purpose: Emit one section per DNS instance with everything it owns.
// Dependencies: iac-forge-core, serde_json
// ============================================================================

//! ## Overview
//! Children reference their instance by the `instance` parent link. Zone
//! references on records and resolvers are scoped to the same instance, so
//! addresses are always built from the owning instance's name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::bool_field;
use iac_forge_core::find;
use iac_forge_core::non_empty_str;
use iac_forge_core::str_field;
use iac_forge_core::str_list;
use serde_json::Value;

use crate::document::Block;
use crate::document::Expr;
use crate::document::Section;
use crate::document::render_sections;
use crate::naming::snake_case;
use crate::naming::title_case;
use crate::refs::Refs;
use crate::refs::record_label;
use crate::refs::subnet_label;
use crate::refs::var_prefixed;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Record fields copied verbatim when present, in emission order.
const RECORD_EXTRAS: [&str; 6] = ["preference", "port", "priority", "weight", "protocol", "service"];

// ============================================================================
// SECTION: Addresses
// ============================================================================

fn instance_label(dns: &str) -> String {
    format!("{}_dns_instance", snake_case(dns))
}

fn instance_guid(dns: &str) -> Expr {
    Expr::raw(format!("ibm_resource_instance.{}.guid", instance_label(dns)))
}

fn zone_label(dns: &str, zone: &str) -> String {
    snake_case(&format!("{dns} dns zone {zone}"))
}

/// Zone id for a zone of `dns`, or the unfound marker.
fn zone_id(refs: &Refs<'_>, dns: &str, zone: Option<&str>) -> Expr {
    match zone.filter(|zone| find(refs.tree(), ResourceKind::DnsZones, Some(dns), zone).is_some()) {
        Some(zone) => Expr::raw(format!("ibm_dns_zone.{}.zone_id", zone_label(dns, zone))),
        None => Expr::Unfound,
    }
}

fn children<'a>(dns: &'a Record, field: &str) -> Vec<&'a Record> {
    dns.get(field)
        .and_then(Value::as_array)
        .map(|records| records.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats the DNS service instance.
#[must_use]
pub fn format_dns_instance(dns: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(dns);
    Block::resource("ibm_resource_instance", instance_label(name))
        .attr("name", var_prefixed(&format!("{name}-dns-instance")))
        .attr("resource_group_id", refs.resource_group_id(str_field(dns, "resource_group")))
        .attr("location", Expr::str("global"))
        .attr("service", Expr::str("dns-svcs"))
        .attr("plan", Expr::str(str_field(dns, "plan").unwrap_or("standard")))
        .attr("tags", refs.tags())
}

/// Formats a zone and one permitted network per attached VPC.
#[must_use]
pub fn format_dns_zone(dns: &str, zone: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(zone);
    let label = zone_label(dns, name);
    let mut blocks = vec![
        Block::resource("ibm_dns_zone", label.clone())
            .attr("name", Expr::str(name))
            .attr("instance_id", instance_guid(dns))
            .attr_opt("description", non_empty_str(zone, "description").map(Expr::str))
            .attr_opt("label", non_empty_str(zone, "label").map(Expr::str)),
    ];
    for vpc in str_list(zone, "vpcs") {
        blocks.push(
            Block::resource(
                "ibm_dns_permitted_network",
                snake_case(&format!("{dns} dns permitted network {name} {vpc}")),
            )
            .attr("instance_id", instance_guid(dns))
            .attr("zone_id", Expr::raw(format!("ibm_dns_zone.{label}.zone_id")))
            .attr("vpc_crn", refs.vpc_module(Some(vpc), "crn"))
            .attr("type", Expr::str("vpc")),
        );
    }
    blocks
}

/// Formats a resource record.
///
/// Records pointing at a virtual server use its primary address as `rdata`.
#[must_use]
pub fn format_dns_record(dns: &str, record: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(record);
    let rdata = if bool_field(record, "use_vsi") {
        Expr::raw(format!(
            "ibm_is_instance.{}.primary_network_interface[0].primary_ip[0].address",
            snake_case(&format!(
                "{} vpc {} vsi",
                str_field(record, "vpc").unwrap_or_default(),
                str_field(record, "vsi").unwrap_or_default()
            ))
        ))
    } else {
        Expr::str(str_field(record, "rdata").unwrap_or_default())
    };
    let block = Block::resource("ibm_dns_resource_record", snake_case(&format!("{dns} dns record {name}")))
        .attr("instance_id", instance_guid(dns))
        .attr("zone_id", zone_id(refs, dns, str_field(record, "dns_zone")))
        .attr("type", Expr::str(str_field(record, "type").unwrap_or_default()))
        .attr("name", Expr::str(name))
        .attr("rdata", rdata)
        .attr_opt("ttl", record.get("ttl").and_then(Expr::from_json));
    RECORD_EXTRAS.iter().fold(block, |block, field| {
        block.attr_opt(field, record.get(*field).filter(|value| !is_blank(value)).and_then(Expr::from_json))
    })
}

fn is_blank(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(str::is_empty)
}

/// Formats a custom resolver with one location per subnet.
#[must_use]
pub fn format_dns_custom_resolver(dns: &str, resolver: &Record) -> Block {
    let name = record_label(resolver);
    let vpc = str_field(resolver, "vpc").unwrap_or_default();
    let locations = str_list(resolver, "subnets").into_iter().map(|subnet| {
        Block::nested("locations")
            .attr("subnet_crn", Expr::raw(format!("ibm_is_subnet.{}.crn", subnet_label(vpc, subnet))))
            .attr("enabled", Expr::Bool(true))
    });
    let block = Block::resource("ibm_dns_custom_resolver", snake_case(&format!("{dns} dns resolver {name}")))
        .attr("name", var_prefixed(name))
        .attr("instance_id", instance_guid(dns))
        .attr_opt("description", non_empty_str(resolver, "description").map(Expr::str))
        .attr("high_availability", Expr::Bool(true))
        .attr("enabled", Expr::Bool(true));
    locations.fold(block, Block::block)
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// One section per DNS instance.
#[must_use]
pub fn dns_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::Dns).into_iter().map(|dns| {
        let name = record_label(dns);
        let mut blocks = vec![format_dns_instance(dns, refs)];
        for zone in children(dns, "zones") {
            blocks.extend(format_dns_zone(name, zone, refs));
        }
        blocks.extend(children(dns, "records").into_iter().map(|record| format_dns_record(name, record, refs)));
        blocks.extend(
            children(dns, "custom_resolvers").into_iter().map(|resolver| format_dns_custom_resolver(name, resolver)),
        );
        Section::new(format!("{} DNS Service", title_case(name)), blocks)
    }))
}
