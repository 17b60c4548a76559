// crates/iac-forge-codegen/src/classic.rs
// ============================================================================
// Module: Classic Infrastructure Generator
// Description: Classic SSH keys and VLANs grouped by datacenter.
// Purpose: Emit classic resources through the `ibm.classic` provider alias.
// Dependencies: iac-forge-core
// ============================================================================

//! ## Overview
//! Datacenters are collected from both SSH keys and VLANs, deduplicated and
//! sorted. Each datacenter gets an SSH key section and a VLAN section, each
//! omitted when empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::non_empty_str;
use iac_forge_core::str_field;

use crate::document::Block;
use crate::document::Expr;
use crate::document::Section;
use crate::document::render_sections;
use crate::naming::snake_case;
use crate::naming::title_case;
use crate::refs::Refs;
use crate::refs::record_label;

const CLASSIC_PROVIDER: &str = "ibm.classic";

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats a classic SSH key.
#[must_use]
pub fn format_classic_ssh_key(key: &Record) -> Block {
    let name = record_label(key);
    Block::resource("ibm_compute_ssh_key", format!("classic_ssh_key_{}", snake_case(name)))
        .attr("provider", Expr::raw(CLASSIC_PROVIDER))
        .attr("label", Expr::str(name))
        .attr("public_key", Expr::raw(format!("var.classic_{}_public_key", snake_case(name))))
}

/// Formats a classic VLAN.
#[must_use]
pub fn format_classic_vlan(vlan: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(vlan);
    let router = non_empty_str(vlan, "router_hostname").map(|router| {
        Expr::raw(format!(
            "replace(ibm_network_vlan.classic_vlan_{}.router_hostname, \"b\", \"f\")",
            snake_case(router)
        ))
    });
    Block::resource("ibm_network_vlan", format!("classic_vlan_{}", snake_case(name)))
        .attr("provider", Expr::raw(CLASSIC_PROVIDER))
        .attr("name", refs.prefixed(name))
        .attr("datacenter", Expr::str(str_field(vlan, "datacenter").unwrap_or_default()))
        .attr("type", Expr::str(str_field(vlan, "type").unwrap_or_default()))
        .attr("tags", refs.tags())
        .attr_opt("router_hostname", router)
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Classic infrastructure sections, datacenters in alphabetical order.
#[must_use]
pub fn classic_infra_tf(refs: &Refs<'_>) -> Option<String> {
    let keys = refs.tree().top_level(ResourceKind::ClassicSshKeys);
    let vlans = refs.tree().top_level(ResourceKind::ClassicVlans);
    let datacenters: BTreeSet<&str> = keys
        .iter()
        .chain(vlans.iter())
        .filter_map(|record| str_field(record, "datacenter"))
        .collect();
    let mut sections = Vec::new();
    for datacenter in datacenters {
        let key_blocks = in_datacenter(&keys, datacenter).map(format_classic_ssh_key).collect();
        sections.extend(Section::non_empty(format!("{} SSH Keys", title_case(datacenter)), key_blocks));
        let vlan_blocks = in_datacenter(&vlans, datacenter).map(|vlan| format_classic_vlan(vlan, refs)).collect();
        sections.extend(Section::non_empty(format!("{} VLANs", title_case(datacenter)), vlan_blocks));
    }
    render_sections(sections)
}

fn in_datacenter<'a>(records: &'a [&'a Record], datacenter: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
    records.iter().copied().filter(move |record| str_field(record, "datacenter") == Some(datacenter))
}
