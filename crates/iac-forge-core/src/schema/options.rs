// crates/iac-forge-core/src/schema/options.rs
// ============================================================================
// Module: Singleton Schemas
// Description: Global options, IAM account settings, and activity tracker.
// Purpose: Define the three singleton records and their cross-tree side effects.
// Dependencies: iac-forge-validate, serde_json, crate::schema
// ============================================================================

//! ## Overview
//! Singletons are initialized once and only ever saved. Changing the options
//! region renames the matching activity tracker location, and turning off
//! dynamic subnets pins every VPC's address prefixes to its current subnets.
//! Disabling IAM account settings clears every other setting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_validate::invalid_ip_comma_list;
use iac_forge_validate::invalid_name_format;
use iac_forge_validate::invalid_tag_list;
use serde_json::Value;
use serde_json::json;

use super::DefaultValue;
use super::FieldSchema;
use super::Reference;
use super::ResourceSchema;
use super::SchemaContext;
use super::any_missing;
use super::fields_invalid;
use super::invalid_in_range;
use super::number_text;
use super::range;
use crate::context::Range;
use crate::kind::ResourceKind;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::bool_field;
use crate::tree::str_field;
use crate::tree::str_list;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Regions available in every deployment.
const BASE_REGIONS: [&str; 5] = ["us-south", "us-east", "eu-de", "eu-gb", "eu-es"];
/// Regions hidden when only Financial Services Cloud regions are allowed.
const NON_FS_REGIONS: [&str; 5] = ["jp-tok", "jp-osa", "au-syd", "ca-tor", "br-sao"];
/// Regions offering Power VS workspaces.
pub const POWER_VS_REGIONS: [&str; 9] =
    ["au-syd", "us-south", "eu-de", "eu-gb", "eu-es", "us-east", "br-sao", "jp-tok", "ca-tor"];
/// Power VS high availability site pairs.
pub const POWER_HA_PAIRS: [(&str, &str); 5] = [
    ("mad02", "eu-de-1"),
    ("mad04", "eu-de-2"),
    ("us-east", "us-south"),
    ("wdc06", "dal12"),
    ("wdc07", "dal10"),
];
/// Maximum prefix length.
const MAX_PREFIX_LENGTH: usize = 16;
/// Session expiration limits in seconds.
const SESSION_EXPIRATION: Range = range(900, 86_400);
/// Session invalidation limits in seconds.
const SESSION_INVALIDATION: Range = range(900, 7_200);
/// Concurrent session limits.
const MAX_SESSIONS: Range = range(1, 10);

// ============================================================================
// SECTION: Options
// ============================================================================

/// Global deployment options.
pub static OPTIONS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Options,
    parent_link: None,
    defaults: &[],
    init: Some(options_init),
    on_create: None,
    on_save: Some(options_save),
    references: &[],
    fields: &[
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("fs_cloud")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("iac")),
            invalid: Some(invalid_prefix),
            invalid_text: Some(|_, _| "Invalid Prefix".to_string()),
            ..FieldSchema::new("prefix")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("")),
            invalid: Some(|record, _| str_field(record, "region").is_none_or(str::is_empty)),
            invalid_text: Some(|_, _| "Select a region".to_string()),
            groups: Some(region_groups),
            on_state_change: Some(clear_power_zones),
            ..FieldSchema::new("region")
        },
        FieldSchema {
            default: Some(DefaultValue::Int(3)),
            groups: Some(|_, _| vec!["1".to_string(), "2".to_string(), "3".to_string()]),
            ..FieldSchema::new("zones")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("private")),
            groups: Some(|_, _| {
                ["Private", "Public", "Public and Private"].map(str::to_string).to_vec()
            }),
            on_state_change: Some(endpoints_to_stored),
            on_render: Some(endpoints_to_display),
            ..FieldSchema::new("endpoints")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("")),
            optional: true,
            ..FieldSchema::new("account_id")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("dynamic_subnets")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            on_state_change: Some(toggle_power_vs),
            ..FieldSchema::new("enable_power_vs")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            hide_when: Some(hide_when_not_power_vs),
            on_state_change: Some(toggle_power_ha),
            ..FieldSchema::new("power_vs_high_availability")
        },
        FieldSchema {
            invalid: Some(invalid_power_ha_zone),
            invalid_text: Some(|_, _| "Select an Availability Zone".to_string()),
            hide_when: Some(hide_when_not_power_ha),
            groups: Some(|_, _| POWER_HA_PAIRS.map(|(site, _)| site.to_string()).to_vec()),
            on_state_change: Some(select_power_ha_site),
            on_render: Some(|record| power_zone_at(record, 0)),
            ..FieldSchema::new("power_vs_ha_zone_1")
        },
        FieldSchema {
            hide_when: Some(hide_when_not_power_ha),
            groups: Some(|_, _| {
                ["eu-de-1", "eu-de-2", "us-south", "dal10", "dal12"].map(str::to_string).to_vec()
            }),
            on_render: Some(|record| power_zone_at(record, 1)),
            ..FieldSchema::new("power_vs_ha_zone_2")
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&[])),
            invalid: Some(invalid_power_zones),
            invalid_text: Some(power_zones_text),
            hide_when: Some(|record| {
                !bool_field(record, "enable_power_vs")
                    || bool_field(record, "power_vs_high_availability")
            }),
            groups: Some(power_zone_groups),
            ..FieldSchema::new("power_vs_zones")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("enable_classic")
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&["hello", "world"])),
            invalid: Some(|record, _| invalid_tag_list(&str_list(record, "tags"))),
            invalid_text: Some(|_, _| "One or more tags are invalid".to_string()),
            helper_text: Some(|_, _| "Enter a comma separated list of tags".to_string()),
            ..FieldSchema::new("tags")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("no_vpn_secrets_manager_auth")
        },
    ],
    disable_save: |record, ctx| {
        fields_invalid(
            record,
            ctx,
            &["prefix", "tags", "power_vs_zones", "region", "power_vs_ha_zone_1"],
        )
    },
};

/// Writes the default options.
fn options_init(tree: &mut ConfigTree) {
    tree.set(
        ResourceKind::Options.as_str(),
        json!({
            "prefix": "iac",
            "region": "us-south",
            "tags": ["hello", "world"],
            "zones": 3,
            "endpoints": "private",
            "account_id": "",
            "fs_cloud": false,
            "enable_classic": false,
            "dynamic_subnets": true,
            "enable_power_vs": false,
            "power_vs_zones": [],
            "no_vpn_secrets_manager_auth": false
        }),
    );
}

/// Applies the cross-tree effects of an options save.
fn options_save(tree: &mut ConfigTree, previous: &Record, merged: &mut Record) {
    if bool_field(previous, "dynamic_subnets") && !bool_field(merged, "dynamic_subnets") {
        pin_address_prefixes(tree);
    }
    follow_region(tree, previous, merged);
}

/// Rebuilds each VPC's `address_prefixes` with one prefix per subnet.
fn pin_address_prefixes(tree: &mut ConfigTree) {
    for (_, vpc) in tree.located_mut(ResourceKind::Vpcs) {
        let vpc_name = str_field(vpc, "name").unwrap_or_default().to_string();
        let prefixes: Vec<Value> = vpc
            .get("subnets")
            .and_then(Value::as_array)
            .map(|subnets| {
                subnets
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|subnet| {
                        json!({
                            "name": subnet.get("name").cloned().unwrap_or(Value::Null),
                            "cidr": subnet.get("cidr").cloned().unwrap_or(Value::Null),
                            "zone": subnet.get("zone").cloned().unwrap_or(Value::Null),
                            "vpc": vpc_name,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        vpc.insert("address_prefixes".to_string(), Value::Array(prefixes));
    }
}

/// Renames the activity tracker location that followed the old region.
fn follow_region(tree: &mut ConfigTree, previous: &Record, merged: &Record) {
    let (Some(old), Some(new)) = (str_field(previous, "region"), str_field(merged, "region"))
    else {
        return;
    };
    if old == new {
        return;
    }
    let Some(locations) = tree
        .singleton_mut(ResourceKind::Atracker)
        .and_then(|atracker| atracker.get_mut("locations"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for location in locations.iter_mut() {
        if location.as_str() == Some(old) {
            *location = Value::from(new);
        }
    }
}

/// Prefix must be a valid name of at most sixteen characters.
fn invalid_prefix(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    let prefix = str_field(record, "prefix").unwrap_or_default();
    prefix.len() > MAX_PREFIX_LENGTH || invalid_name_format(prefix)
}

/// Region choices, narrowed when only FS Cloud regions are allowed.
fn region_groups(record: &Record, _ctx: &SchemaContext<'_>) -> Vec<String> {
    let mut regions: Vec<String> = BASE_REGIONS.iter().map(|region| (*region).to_string()).collect();
    if !bool_field(record, "fs_cloud") {
        regions.extend(NON_FS_REGIONS.iter().map(|region| (*region).to_string()));
    }
    regions.sort();
    regions
}

fn clear_power_zones(record: &mut Record) {
    record.insert("power_vs_zones".to_string(), Value::Array(Vec::new()));
}

/// `Public and Private` becomes `public-and-private`.
fn endpoints_to_stored(record: &mut Record) {
    let display = str_field(record, "endpoints").unwrap_or_default();
    let stored = display.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    record.insert("endpoints".to_string(), Value::from(stored));
}

/// `public-and-private` becomes `Public and Private`.
fn endpoints_to_display(record: &Record) -> String {
    str_field(record, "endpoints")
        .unwrap_or_default()
        .split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.eq_ignore_ascii_case("and") {
                "and".to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

/// Flips Power VS and clears the selected zones.
fn toggle_power_vs(record: &mut Record) {
    let enabled = bool_field(record, "enable_power_vs");
    record.insert("enable_power_vs".to_string(), Value::Bool(!enabled));
    clear_power_zones(record);
}

/// Flips Power VS high availability and clears the selected zones.
fn toggle_power_ha(record: &mut Record) {
    let enabled = bool_field(record, "power_vs_high_availability");
    record.insert("power_vs_high_availability".to_string(), Value::Bool(!enabled));
    clear_power_zones(record);
}

fn hide_when_not_power_vs(record: &Record) -> bool {
    !bool_field(record, "enable_power_vs")
}

fn hide_when_not_power_ha(record: &Record) -> bool {
    hide_when_not_power_vs(record) || !bool_field(record, "power_vs_high_availability")
}

/// Returns the paired site for a high availability site.
#[must_use]
pub fn power_ha_pair(site: &str) -> Option<&'static str> {
    POWER_HA_PAIRS.iter().find(|(first, _)| *first == site).map(|(_, second)| *second)
}

/// Selecting the first site fills in both zones of the pair.
fn select_power_ha_site(record: &mut Record) {
    let site = str_field(record, "power_vs_ha_zone_1").unwrap_or_default().to_string();
    let mut zones = vec![Value::from(site.as_str())];
    if let Some(pair) = power_ha_pair(&site) {
        zones.push(Value::from(pair));
    }
    record.insert("power_vs_zones".to_string(), Value::Array(zones));
}

fn power_zone_at(record: &Record, index: usize) -> String {
    str_list(record, "power_vs_zones").get(index).map(|zone| (*zone).to_string()).unwrap_or_default()
}

fn invalid_power_ha_zone(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    !hide_when_not_power_ha(record) && str_list(record, "power_vs_zones").is_empty()
}

fn region_has_power_vs(record: &Record) -> bool {
    str_field(record, "region").is_some_and(|region| POWER_VS_REGIONS.contains(&region))
}

fn invalid_power_zones(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    bool_field(record, "enable_power_vs")
        && !bool_field(record, "power_vs_high_availability")
        && (str_list(record, "power_vs_zones").is_empty() || !region_has_power_vs(record))
}

fn power_zones_text(record: &Record, _ctx: &SchemaContext<'_>) -> String {
    if region_has_power_vs(record) {
        "Select at least one Availability Zone".to_string()
    } else {
        format!(
            "The region {} does not have any available Power VS zones",
            str_field(record, "region").unwrap_or_default()
        )
    }
}

/// Power VS zones offered in the selected region.
fn power_zone_groups(record: &Record, _ctx: &SchemaContext<'_>) -> Vec<String> {
    if bool_field(record, "power_vs_high_availability") {
        return vec!["dal12".to_string(), "wdc06".to_string()];
    }
    let zones: &[&str] = match str_field(record, "region").unwrap_or_default() {
        "au-syd" => &["syd04", "syd05"],
        "eu-de" => &["eu-de-1", "eu-de-2"],
        "eu-gb" => &["lon04", "lon06"],
        "eu-es" => &["mad02", "mad04"],
        "us-east" => &["us-east", "wdc06", "wdc07"],
        "us-south" => &["us-south", "dal10", "dal12"],
        "jp-tok" => &["tok04"],
        "br-sao" => &["sao01", "sao04"],
        "ca-tor" => &["tor01"],
        _ => &[],
    };
    zones.iter().map(|zone| (*zone).to_string()).collect()
}

// ============================================================================
// SECTION: IAM Account Settings
// ============================================================================

/// Settings kept when account settings are disabled.
const IAM_KEPT_ON_DISABLE: [&str; 2] = ["enable", "include_history"];

/// Account-wide IAM settings.
pub static IAM_ACCOUNT_SETTINGS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::IamAccountSettings,
    parent_link: None,
    defaults: &[],
    init: Some(iam_init),
    on_create: None,
    on_save: Some(iam_save),
    references: &[],
    fields: &[
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("enable")
        },
        FieldSchema {
            groups: Some(|_, _| {
                ["NONE", "TOTP", "TOTP4ALL", "LEVEL1", "LEVEL2", "LEVEL3"]
                    .map(str::to_string)
                    .to_vec()
            }),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("mfa")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                invalid_ip_comma_list(str_field(record, "allowed_ip_addresses"))
            }),
            invalid_text: Some(|_, _| {
                "Enter a comma separated list of IP addresses or CIDR blocks".to_string()
            }),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("allowed_ip_addresses")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("include_history")
        },
        FieldSchema {
            optional: true,
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("if_match")
        },
        FieldSchema {
            invalid: Some(|record, ctx| {
                invalid_in_range(
                    record,
                    "max_sessions_per_identity",
                    ctx.op.range_or("max_sessions_per_identity", MAX_SESSIONS),
                )
            }),
            invalid_text: Some(|_, ctx| {
                number_text(ctx.op.range_or("max_sessions_per_identity", MAX_SESSIONS))
            }),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("max_sessions_per_identity")
        },
        FieldSchema {
            groups: Some(restriction_groups),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("restrict_create_service_id")
        },
        FieldSchema {
            groups: Some(restriction_groups),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("restrict_create_platform_apikey")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                invalid_in_range(record, "session_expiration_in_seconds", SESSION_EXPIRATION)
            }),
            invalid_text: Some(|_, _| number_text(SESSION_EXPIRATION)),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("session_expiration_in_seconds")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                invalid_in_range(record, "session_invalidation_in_seconds", SESSION_INVALIDATION)
            }),
            invalid_text: Some(|_, _| number_text(SESSION_INVALIDATION)),
            hide_when: Some(iam_hidden),
            ..FieldSchema::new("session_invalidation_in_seconds")
        },
    ],
    disable_save: |record, ctx| {
        any_missing(
            record,
            &[
                "mfa",
                "restrict_create_platform_apikey",
                "restrict_create_service_id",
                "max_sessions_per_identity",
            ],
        ) || fields_invalid(
            record,
            ctx,
            &[
                "allowed_ip_addresses",
                "max_sessions_per_identity",
                "session_expiration_in_seconds",
                "session_invalidation_in_seconds",
            ],
        )
    },
};

fn iam_init(tree: &mut ConfigTree) {
    tree.set(
        ResourceKind::IamAccountSettings.as_str(),
        json!({
            "enable": false,
            "mfa": null,
            "allowed_ip_addresses": null,
            "include_history": false,
            "if_match": null,
            "max_sessions_per_identity": null,
            "restrict_create_service_id": null,
            "restrict_create_platform_apikey": null,
            "session_expiration_in_seconds": null,
            "session_invalidation_in_seconds": null
        }),
    );
}

/// Turning settings off clears everything except the toggles.
fn iam_save(_tree: &mut ConfigTree, previous: &Record, merged: &mut Record) {
    if bool_field(previous, "enable") && !bool_field(merged, "enable") {
        for (field, value) in merged.iter_mut() {
            if !IAM_KEPT_ON_DISABLE.contains(&field.as_str()) {
                *value = Value::Null;
            }
        }
    }
}

fn iam_hidden(record: &Record) -> bool {
    !bool_field(record, "enable")
}

fn restriction_groups(_record: &Record, _ctx: &SchemaContext<'_>) -> Vec<String> {
    ["RESTRICTED", "NOT_RESTRICTED", "NOT_SET"].map(str::to_string).to_vec()
}

// ============================================================================
// SECTION: Activity Tracker
// ============================================================================

/// Activity tracker route and target.
pub static ATRACKER: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Atracker,
    parent_link: None,
    defaults: &[],
    init: Some(atracker_init),
    on_create: None,
    on_save: None,
    references: &[
        Reference::one("bucket", ResourceKind::Buckets),
        Reference::one("cos_key", ResourceKind::CosKeys),
    ],
    fields: &[
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("enabled")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("cos")),
            ..FieldSchema::new("type")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("atracker")),
            ..FieldSchema::new("name")
        },
        FieldSchema {
            default: Some(DefaultValue::Null),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::Buckets)),
            ..FieldSchema::new("bucket")
        },
        FieldSchema {
            default: Some(DefaultValue::Null),
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::CosKeys)),
            ..FieldSchema::new("cos_key")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("add_route")
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&["global", "us-south"])),
            ..FieldSchema::new("locations")
        },
    ],
    disable_save: |record, _| any_missing(record, &["bucket", "cos_key", "locations"]),
};

fn atracker_init(tree: &mut ConfigTree) {
    tree.set(
        ResourceKind::Atracker.as_str(),
        json!({
            "enabled": false,
            "type": "cos",
            "name": "atracker",
            "bucket": null,
            "cos_key": null,
            "add_route": true,
            "locations": ["global", "us-south"]
        }),
    );
}

/// Names of every record of a kind, across all parents.
pub(super) fn names_of(ctx: &SchemaContext<'_>, kind: ResourceKind) -> Vec<String> {
    ctx.tree.names(kind, None).into_iter().map(str::to_string).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
