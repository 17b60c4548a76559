// crates/iac-forge-core/src/schema/dns.rs
// ============================================================================
// Module: DNS Schemas
// Description: DNS instances with their zones, records, and custom resolvers.
// Purpose: Define private DNS records, record-type rules, and resolver scoping.
// Dependencies: iac-forge-validate, crate::schema
// ============================================================================

//! ## Overview
//! A DNS instance owns three child collections. Zones list the VPCs they are
//! permitted on; records point at a zone of the same instance; custom
//! resolvers pick a VPC, subnets inside that VPC, and optionally a zone of
//! the same instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_validate::invalid_description;
use iac_forge_validate::is_ipv4_address;
use iac_forge_validate::is_null_or_empty;

use super::DefaultValue;
use super::FieldSchema;
use super::NAME_FIELD;
use super::Reference;
use super::ResourceSchema;
use super::SchemaContext;
use super::Scope;
use super::any_missing;
use super::fields_invalid;
use super::invalid_in_range;
use super::invalid_name;
use super::number_text;
use super::options::names_of;
use super::range;
use crate::context::Range;
use crate::kind::ResourceKind;
use crate::tree::Record;
use crate::tree::bool_field;
use crate::tree::non_empty_str;
use crate::tree::str_field;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Record types.
pub const RECORD_TYPES: [&str; 7] = ["A", "AAAA", "CNAME", "MX", "PTR", "SRV", "TXT"];
/// Record time-to-live limits in seconds.
const RECORD_TTL: Range = range(60, 2_147_483_647);
/// Limits for MX preference and SRV priority and weight.
const RECORD_U16: Range = range(0, 65_535);
/// SRV port limits.
const RECORD_PORT: Range = range(1, 65_535);
/// Fields an SRV record must carry.
const SRV_FIELDS: [&str; 5] = ["port", "protocol", "priority", "service", "weight"];

const DESCRIPTION_FIELD: FieldSchema = FieldSchema {
    optional: true,
    invalid: Some(|record, _| invalid_description(str_field(record, "description"))),
    invalid_text: Some(|_, _| "Invalid description".to_string()),
    ..FieldSchema::new("description")
};

// ============================================================================
// SECTION: Instances
// ============================================================================

/// DNS service instances.
pub static DNS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Dns,
    parent_link: None,
    defaults: &[
        ("zones", DefaultValue::StrList(&[])),
        ("records", DefaultValue::StrList(&[])),
        ("custom_resolvers", DefaultValue::StrList(&[])),
    ],
    init: None,
    on_create: None,
    on_save: None,
    references: &[Reference::one("resource_group", ResourceKind::ResourceGroups)],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::ResourceGroups)),
            ..FieldSchema::new("resource_group")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("standard")),
            groups: Some(|_, _| vec!["free".to_string(), "standard".to_string()]),
            ..FieldSchema::new("plan")
        },
    ],
    disable_save: |record, ctx| invalid_name(record, ctx) || any_missing(record, &["resource_group"]),
};

// ============================================================================
// SECTION: Zones
// ============================================================================

/// Zones owned by a DNS instance.
pub static ZONES: ResourceSchema = ResourceSchema {
    kind: ResourceKind::DnsZones,
    parent_link: Some("instance"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[Reference::many("vpcs", ResourceKind::Vpcs)],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            default: Some(DefaultValue::StrList(&[])),
            invalid: Some(|record, _| any_missing(record, &["vpcs"])),
            invalid_text: Some(|_, _| "Select at least one VPC".to_string()),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::Vpcs)),
            ..FieldSchema::new("vpcs")
        },
        FieldSchema {
            invalid: Some(|record, _| any_missing(record, &["label"])),
            ..FieldSchema::new("label")
        },
        DESCRIPTION_FIELD,
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["vpcs", "label", "description"])
    },
};

// ============================================================================
// SECTION: Records
// ============================================================================

/// Records owned by a DNS instance.
pub static RECORDS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::DnsRecords,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[
        Reference::one("dns_zone", ResourceKind::DnsZones).scoped(Scope::Sibling),
        Reference::one("vpc", ResourceKind::Vpcs),
    ],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            groups: Some(|_, _| RECORD_TYPES.map(str::to_string).to_vec()),
            ..FieldSchema::new("type")
        },
        FieldSchema {
            groups: Some(|_, ctx| {
                ctx.tree
                    .names(ResourceKind::DnsZones, ctx.op.parent())
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }),
            ..FieldSchema::new("dns_zone")
        },
        FieldSchema {
            hide_when: Some(|record| bool_field(record, "use_vsi")),
            ..FieldSchema::new("rdata")
        },
        FieldSchema {
            default: Some(DefaultValue::Int(300)),
            invalid: Some(|record, _| invalid_in_range(record, "ttl", RECORD_TTL)),
            invalid_text: Some(|_, _| number_text(RECORD_TTL)),
            ..FieldSchema::new("ttl")
        },
        FieldSchema {
            invalid: Some(|record, _| invalid_in_range(record, "preference", RECORD_U16)),
            invalid_text: Some(|_, _| number_text(RECORD_U16)),
            hide_when: Some(|record| record_type(record) != "MX"),
            ..FieldSchema::new("preference")
        },
        FieldSchema {
            invalid: Some(|record, _| invalid_in_range(record, "port", RECORD_PORT)),
            invalid_text: Some(|_, _| number_text(RECORD_PORT)),
            hide_when: Some(not_srv),
            ..FieldSchema::new("port")
        },
        FieldSchema {
            invalid: Some(|record, _| invalid_in_range(record, "priority", RECORD_U16)),
            invalid_text: Some(|_, _| number_text(RECORD_U16)),
            hide_when: Some(not_srv),
            ..FieldSchema::new("priority")
        },
        FieldSchema {
            invalid: Some(|record, _| invalid_in_range(record, "weight", RECORD_U16)),
            invalid_text: Some(|_, _| number_text(RECORD_U16)),
            hide_when: Some(not_srv),
            ..FieldSchema::new("weight")
        },
        FieldSchema {
            groups: Some(|_, _| vec!["udp".to_string(), "tcp".to_string()]),
            hide_when: Some(not_srv),
            ..FieldSchema::new("protocol")
        },
        FieldSchema {
            invalid: Some(|record, _| {
                non_empty_str(record, "service").is_some_and(|service| !service.starts_with('_'))
            }),
            invalid_text: Some(|_, _| "Service must start with an underscore".to_string()),
            hide_when: Some(not_srv),
            ..FieldSchema::new("service")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("use_vsi")
        },
        FieldSchema {
            invalid: Some(|record, _| bool_field(record, "use_vsi") && any_missing(record, &["vpc"])),
            hide_when: Some(|record| !bool_field(record, "use_vsi")),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::Vpcs)),
            ..FieldSchema::new("vpc")
        },
        FieldSchema {
            invalid: Some(|record, _| bool_field(record, "use_vsi") && any_missing(record, &["vsi"])),
            hide_when: Some(|record| !bool_field(record, "use_vsi")),
            ..FieldSchema::new("vsi")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["type", "dns_zone"])
            || (!bool_field(record, "use_vsi") && any_missing(record, &["rdata"]))
            || fields_invalid(
                record,
                ctx,
                &["ttl", "preference", "port", "priority", "weight", "service", "vpc", "vsi"],
            )
            || !valid_record(record, ctx)
    },
};

fn record_type(record: &Record) -> &str {
    str_field(record, "type").unwrap_or_default()
}

fn not_srv(record: &Record) -> bool {
    record_type(record) != "SRV"
}

/// Type-specific record content checks.
///
/// `A` records need an IPv4 address, `MX` records a preference, and `SRV`
/// records every SRV field.
#[must_use]
pub fn valid_record(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    match record_type(record) {
        "A" if !bool_field(record, "use_vsi") => {
            str_field(record, "rdata").is_some_and(is_ipv4_address)
        }
        "MX" => !is_null_or_empty(record.get("preference")),
        "SRV" => !any_missing(record, &SRV_FIELDS),
        _ => true,
    }
}

// ============================================================================
// SECTION: Custom Resolvers
// ============================================================================

/// Custom resolvers owned by a DNS instance.
pub static CUSTOM_RESOLVERS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::DnsCustomResolvers,
    parent_link: Some("instance"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[
        Reference::one("vpc", ResourceKind::Vpcs),
        Reference::many("subnets", ResourceKind::Subnets).scoped(Scope::Field("vpc")),
        Reference::one("zone", ResourceKind::DnsZones).scoped(Scope::Sibling),
    ],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            invalid: Some(|record, _| any_missing(record, &["vpc"])),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::Vpcs)),
            ..FieldSchema::new("vpc")
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&[])),
            invalid: Some(|record, _| any_missing(record, &["subnets"])),
            groups: Some(|record, ctx| match non_empty_str(record, "vpc") {
                Some(vpc) => ctx
                    .tree
                    .names(ResourceKind::Subnets, Some(vpc))
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                None => Vec::new(),
            }),
            ..FieldSchema::new("subnets")
        },
        FieldSchema {
            optional: true,
            default: Some(DefaultValue::Null),
            ..FieldSchema::new("zone")
        },
        DESCRIPTION_FIELD,
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["vpc", "subnets", "description"])
    },
};

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::OpContext;
    use crate::schema::object;
    use crate::tree::ConfigTree;

    #[test]
    fn type_specific_fields_are_hidden() {
        let a = object(json!({"type": "A"}));
        let preference = RECORDS.field("preference");
        let port = RECORDS.field("port");
        assert!(preference.is_some_and(|field| field.is_hidden(&a)));
        assert!(port.is_some_and(|field| field.is_hidden(&a)));
        let mx = object(json!({"type": "MX"}));
        assert!(preference.is_some_and(|field| !field.is_hidden(&mx)));
    }

    #[test]
    fn ttl_must_be_whole_and_in_range() {
        let tree = ConfigTree::new();
        let op = OpContext::new();
        let ctx = SchemaContext {
            kind: ResourceKind::DnsRecords,
            tree: &tree,
            op: &op,
        };
        let ttl = RECORDS.field("ttl");
        assert!(ttl.is_some_and(|field| field.is_invalid(&object(json!({"ttl": "1.2"})), &ctx)));
        assert!(ttl.is_some_and(|field| field.is_invalid(&object(json!({"ttl": "2"})), &ctx)));
        assert!(ttl.is_some_and(|field| !field.is_invalid(&object(json!({"ttl": 300})), &ctx)));
    }

    #[test]
    fn srv_records_need_every_srv_field() {
        let tree = ConfigTree::new();
        let op = OpContext::new();
        let ctx = SchemaContext {
            kind: ResourceKind::DnsRecords,
            tree: &tree,
            op: &op,
        };
        let partial = object(json!({"type": "SRV", "port": 443}));
        let full = object(json!({
            "type": "SRV",
            "port": 443,
            "protocol": "tcp",
            "priority": 1,
            "service": "_https",
            "weight": 1
        }));
        assert!(!valid_record(&partial, &ctx));
        assert!(valid_record(&full, &ctx));
    }
}
