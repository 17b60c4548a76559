// crates/iac-forge-core/src/schema/network.rs
// ============================================================================
// Module: Network Schemas
// Description: VPCs, subnets, security groups, SSH keys, gateways, classic.
// Purpose: Define networking records and their save gating rules.
// Dependencies: iac-forge-validate, serde_json, crate::schema
// ============================================================================

//! ## Overview
//! VPCs own subnets and security groups own rules. Transit gateway
//! connections are stored inline and each names its gateway and its VPC; a
//! connection whose VPC disappears is dropped. Classic infrastructure records
//! live in their own collections and are grouped by datacenter at emit time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_validate::PortField;
use iac_forge_validate::invalid_cidr_block;
use iac_forge_validate::invalid_crn_list;
use iac_forge_validate::invalid_name_format;
use iac_forge_validate::invalid_ssh_public_key;
use iac_forge_validate::invalid_number;
use iac_forge_validate::is_ipv4_cidr_or_address;
use iac_forge_validate::is_null_or_empty;
use iac_forge_validate::number_value;
use serde_json::Value;
use serde_json::json;

use super::DefaultValue;
use super::FieldPath;
use super::FieldSchema;
use super::NAME_FIELD;
use super::Reference;
use super::ResourceSchema;
use super::SchemaContext;
use super::any_missing;
use super::fields_invalid;
use super::invalid_in_range;
use super::invalid_name;
use super::number_text;
use super::options::names_of;
use super::prefixed_name;
use super::range;
use crate::context::Range;
use crate::kind::ResourceKind;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::bool_field;
use crate::tree::non_empty_str;
use crate::tree::str_field;
use crate::tree::str_list;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder bucket meaning flow logs are disabled for a VPC.
pub const FLOW_LOGS_DISABLED: &str = "$disabled";
/// Availability zone index limits.
const SUBNET_ZONE: Range = range(1, 3);
/// Classic datacenters.
pub const CLASSIC_DATACENTERS: [&str; 27] = [
    "ams03", "che01", "dal10", "dal12", "dal13", "fra02", "fra04", "fra05", "lon04", "lon05",
    "lon06", "mil01", "mon01", "osl01", "par01", "sao01", "sjc03", "sjc04", "syd04", "syd05",
    "tok02", "tok04", "tok05", "tor01", "wdc04", "wdc06", "wdc07",
];
/// Classic VLAN types.
const VLAN_TYPES: [&str; 2] = ["PUBLIC", "PRIVATE"];

const RESOURCE_GROUP_REF: Reference = Reference::one("resource_group", ResourceKind::ResourceGroups);

const RESOURCE_GROUP_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Null),
    groups: Some(|_, ctx| names_of(ctx, ResourceKind::ResourceGroups)),
    ..FieldSchema::new("resource_group")
};

const VPC_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Null),
    groups: Some(|_, ctx| names_of(ctx, ResourceKind::Vpcs)),
    ..FieldSchema::new("vpc")
};

const NAMED_WITH_PREFIX: FieldSchema = FieldSchema {
    helper_text: Some(prefixed_name),
    ..NAME_FIELD
};

/// Optional name field checked only when filled in.
const fn optional_name(name: &'static str) -> FieldSchema {
    FieldSchema {
        optional: true,
        invalid: Some(invalid_optional_name),
        ..FieldSchema::new(name)
    }
}

fn invalid_optional_name(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    [
        "default_network_acl_name",
        "default_security_group_name",
        "default_routing_table_name",
    ]
    .iter()
    .filter_map(|field| non_empty_str(record, field))
    .any(invalid_name_format)
}

// ============================================================================
// SECTION: VPCs
// ============================================================================

/// Virtual private clouds.
pub static VPCS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Vpcs,
    parent_link: None,
    defaults: &[("subnets", DefaultValue::StrList(&[]))],
    init: Some(vpcs_init),
    on_create: None,
    on_save: None,
    references: &[
        RESOURCE_GROUP_REF,
        Reference {
            keep: Some(FLOW_LOGS_DISABLED),
            ..Reference::one("bucket", ResourceKind::Buckets)
        },
    ],
    fields: &[
        NAMED_WITH_PREFIX,
        RESOURCE_GROUP_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Str(FLOW_LOGS_DISABLED)),
            ..FieldSchema::new("bucket")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("classic_access")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("manual_address_prefix_management")
        },
        optional_name("default_network_acl_name"),
        optional_name("default_security_group_name"),
        optional_name("default_routing_table_name"),
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["bucket", "resource_group"])
            || invalid_optional_name(record, ctx)
    },
};

/// Writes the management and workload VPCs with their default subnets.
fn vpcs_init(tree: &mut ConfigTree) {
    let vpcs = vec![
        seeded_vpc("management", "management-rg", 10, &["vsi", "vpe", "vpn"]),
        seeded_vpc("workload", "workload-rg", 40, &["vsi", "vpe"]),
    ];
    tree.set(ResourceKind::Vpcs.as_str(), Value::Array(vpcs));
}

/// Builds a seeded VPC. The VPN tier only has a subnet in the first zone.
fn seeded_vpc(name: &str, resource_group: &str, first_octet: u8, tiers: &[&str]) -> Value {
    let mut subnets = Vec::new();
    for zone in 1_u8 ..= 3 {
        for (index, tier) in tiers.iter().enumerate() {
            if *tier == "vpn" && zone > 1 {
                continue;
            }
            let block = first_octet + (zone - 1) * 10;
            let tier_octet = (index + 1) * 10;
            subnets.push(json!({
                "vpc": name,
                "zone": zone,
                "cidr": format!("10.{block}.{tier_octet}.0/24"),
                "name": format!("{tier}-zone-{zone}"),
                "public_gateway": false
            }));
        }
    }
    json!({
        "name": name,
        "resource_group": resource_group,
        "bucket": FLOW_LOGS_DISABLED,
        "classic_access": false,
        "manual_address_prefix_management": false,
        "default_network_acl_name": null,
        "default_security_group_name": null,
        "default_routing_table_name": null,
        "subnets": subnets
    })
}

/// Subnets owned by a VPC.
pub static SUBNETS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Subnets,
    parent_link: Some("vpc"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            invalid: Some(|record, _| invalid_cidr_block(str_field(record, "cidr").unwrap_or_default())),
            invalid_text: Some(|_, _| "Invalid CIDR block".to_string()),
            ..FieldSchema::new("cidr")
        },
        FieldSchema {
            invalid: Some(|record, _| {
                any_missing(record, &["zone"]) || invalid_in_range(record, "zone", SUBNET_ZONE)
            }),
            invalid_text: Some(|_, _| number_text(SUBNET_ZONE)),
            ..FieldSchema::new("zone")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("public_gateway")
        },
    ],
    disable_save: |record, ctx| invalid_name(record, ctx) || fields_invalid(record, ctx, &["cidr", "zone"]),
};

// ============================================================================
// SECTION: Security Groups
// ============================================================================

/// Security groups.
pub static SECURITY_GROUPS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::SecurityGroups,
    parent_link: None,
    defaults: &[("rules", DefaultValue::StrList(&[]))],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF, Reference::one("vpc", ResourceKind::Vpcs)],
    fields: &[NAMED_WITH_PREFIX, RESOURCE_GROUP_FIELD, VPC_FIELD],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || any_missing(record, &["resource_group", "vpc"])
    },
};

/// Rules owned by a security group.
pub static SG_RULES: ResourceSchema = ResourceSchema {
    kind: ResourceKind::SgRules,
    parent_link: Some("sg"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Str("inbound")),
            groups: Some(|_, _| vec!["inbound".to_string(), "outbound".to_string()]),
            ..FieldSchema::new("direction")
        },
        FieldSchema {
            invalid: Some(|record, _| {
                !is_ipv4_cidr_or_address(str_field(record, "source").unwrap_or_default())
            }),
            invalid_text: Some(|_, _| "Invalid source IP or CIDR".to_string()),
            ..FieldSchema::new("source")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("all")),
            groups: Some(|_, _| ["all", "tcp", "udp", "icmp"].map(str::to_string).to_vec()),
            ..FieldSchema::new("protocol")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["source"]) || invalid_port(record)
    },
};

/// Checks the ports that apply to the rule's protocol.
///
/// Unset and zero values are not checked.
#[must_use]
pub fn invalid_port(record: &Record) -> bool {
    let fields: &[PortField] = match str_field(record, "protocol").unwrap_or("all") {
        "icmp" => &[PortField::IcmpType, PortField::IcmpCode],
        "tcp" | "udp" => &[PortField::PortMin, PortField::PortMax],
        _ => &[],
    };
    fields.iter().any(|field| {
        let value = record.get(field.field_name());
        let unset = is_null_or_empty(value)
            || value.and_then(number_value).is_some_and(|number| number.abs() < f64::EPSILON);
        let (min, max) = field.bounds();
        !unset && invalid_number(value, min, max)
    })
}

// ============================================================================
// SECTION: SSH Keys
// ============================================================================

/// VPC SSH keys.
pub static SSH_KEYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::SshKeys,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        RESOURCE_GROUP_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("use_data")
        },
        FieldSchema {
            invalid: Some(|record, _| {
                !bool_field(record, "use_data")
                    && invalid_ssh_public_key(str_field(record, "public_key").unwrap_or_default())
            }),
            invalid_text: Some(|_, _| "Provide a unique SSH public key".to_string()),
            hide_when: Some(|record| bool_field(record, "use_data")),
            ..FieldSchema::new("public_key")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["resource_group"])
            || fields_invalid(record, ctx, &["public_key"])
    },
};

// ============================================================================
// SECTION: Transit Gateways
// ============================================================================

/// Transit gateways with inline connections.
pub static TRANSIT_GATEWAYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::TransitGateways,
    parent_link: None,
    defaults: &[("connections", DefaultValue::StrList(&[]))],
    init: None,
    on_create: None,
    on_save: Some(transit_gateway_save),
    references: &[
        RESOURCE_GROUP_REF,
        Reference {
            path: FieldPath::Each {
                array: "connections",
                field: "vpc",
            },
            ..Reference::one("connections", ResourceKind::Vpcs)
        },
    ],
    fields: &[
        NAMED_WITH_PREFIX,
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("use_data")
        },
        FieldSchema {
            hide_when: Some(|record| bool_field(record, "use_data")),
            ..RESOURCE_GROUP_FIELD
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            hide_when: Some(|record| bool_field(record, "use_data")),
            ..FieldSchema::new("global")
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&[])),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::Vpcs)),
            ..FieldSchema::new("connections")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                let crns = str_list(record, "crns");
                !crns.is_empty() && invalid_crn_list(&crns)
            }),
            invalid_text: Some(|_, _| "Enter a valid comma separated list of CRNs".to_string()),
            ..FieldSchema::new("crns")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || (!bool_field(record, "use_data") && any_missing(record, &["resource_group"]))
            || fields_invalid(record, ctx, &["crns"])
    },
};

/// Every connection follows the gateway's current name.
fn transit_gateway_save(_tree: &mut ConfigTree, _previous: &Record, merged: &mut Record) {
    let Some(name) = str_field(merged, "name").map(str::to_string) else {
        return;
    };
    if let Some(connections) = merged.get_mut("connections").and_then(Value::as_array_mut) {
        for connection in connections.iter_mut().filter_map(Value::as_object_mut) {
            connection.insert("tgw".to_string(), Value::from(name.as_str()));
        }
    }
}

// ============================================================================
// SECTION: Classic Infrastructure
// ============================================================================

const DATACENTER_FIELD: FieldSchema = FieldSchema {
    invalid: Some(|record, _| any_missing(record, &["datacenter"])),
    invalid_text: Some(|_, _| "Select a datacenter".to_string()),
    groups: Some(|_, _| CLASSIC_DATACENTERS.map(str::to_string).to_vec()),
    ..FieldSchema::new("datacenter")
};

/// Classic infrastructure SSH keys.
pub static CLASSIC_SSH_KEYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::ClassicSshKeys,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            invalid: Some(|record, _| {
                invalid_ssh_public_key(str_field(record, "public_key").unwrap_or_default())
            }),
            invalid_text: Some(|_, _| "Provide a valid SSH public key".to_string()),
            ..FieldSchema::new("public_key")
        },
        DATACENTER_FIELD,
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["public_key", "datacenter"])
    },
};

/// Classic infrastructure VLANs.
pub static CLASSIC_VLANS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::ClassicVlans,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[Reference::one("router_hostname", ResourceKind::ClassicVlans)],
    fields: &[
        NAME_FIELD,
        DATACENTER_FIELD,
        FieldSchema {
            invalid: Some(|record, _| {
                str_field(record, "type").is_none_or(|kind| !VLAN_TYPES.contains(&kind))
            }),
            invalid_text: Some(|_, _| "Select a VLAN type".to_string()),
            groups: Some(|_, _| VLAN_TYPES.map(str::to_string).to_vec()),
            ..FieldSchema::new("type")
        },
        FieldSchema {
            optional: true,
            groups: Some(|record, ctx| {
                let datacenter = str_field(record, "datacenter");
                ctx.tree
                    .top_level(ResourceKind::ClassicVlans)
                    .into_iter()
                    .filter(|vlan| str_field(vlan, "datacenter") == datacenter)
                    .filter(|vlan| str_field(vlan, "name") != str_field(record, "name"))
                    .filter_map(|vlan| str_field(vlan, "name").map(str::to_string))
                    .collect()
            }),
            ..FieldSchema::new("router_hostname")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["datacenter", "type"])
    },
};

// ============================================================================
// SECTION: Tests
// ============================================================================
