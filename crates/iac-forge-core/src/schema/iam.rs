// crates/iac-forge-core/src/schema/iam.rs
// ============================================================================
// Module: IAM Schemas
// Description: Access groups with their policies and dynamic rules.
// Purpose: Define access control records and condition transforms.
// Dependencies: iac-forge-validate, serde_json, crate::schema
// ============================================================================

//! ## Overview
//! Access groups own policies and dynamic rules. A new group carries an
//! empty invite list addressed to itself; renaming the group readdresses it.
//! Dynamic rule conditions are edited as flat fields and stored in a nested
//! `conditions` object, with operators shown in friendly form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_validate::is_valid_url;
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
use crate::tree::str_field;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dynamic rule expiration limits in hours.
const EXPIRATION: Range = range(1, 24);
/// Condition operators in stored form.
pub const OPERATORS: [&str; 6] =
    ["EQUALS", "EQUALS_IGNORE_CASE", "IN", "NOT_EQUALS_IGNORE_CASE", "NOT_EQUALS", "CONTAINS"];
/// Stored operator suffix rendered as a parenthetical.
const IGNORE_CASE: &str = "_IGNORE_CASE";

// ============================================================================
// SECTION: Access Groups
// ============================================================================

/// IAM access groups.
pub static ACCESS_GROUPS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::AccessGroups,
    parent_link: None,
    defaults: &[
        ("policies", DefaultValue::StrList(&[])),
        ("dynamic_policies", DefaultValue::StrList(&[])),
        ("has_invites", DefaultValue::Bool(false)),
    ],
    init: None,
    on_create: Some(address_invites),
    on_save: Some(access_group_save),
    references: &[],
    fields: &[
        FieldSchema {
            helper_text: Some(prefixed_name),
            ..NAME_FIELD
        },
        FieldSchema {
            optional: true,
            ..FieldSchema::new("description")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("has_invites")
        },
    ],
    disable_save: invalid_name,
};

fn access_group_save(_tree: &mut ConfigTree, _previous: &Record, merged: &mut Record) {
    address_invites(merged);
}

/// Points the invite list at the group's current name, creating it if absent.
fn address_invites(record: &mut Record) {
    let name = str_field(record, "name").unwrap_or_default().to_string();
    match record.get_mut("invites").and_then(Value::as_object_mut) {
        Some(invites) => {
            invites.insert("group".to_string(), Value::from(name));
        }
        None => {
            record.insert("invites".to_string(), json!({"group": name, "ibm_ids": []}));
        }
    }
}

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Access policies owned by an access group.
pub static POLICIES: ResourceSchema = ResourceSchema {
    kind: ResourceKind::AccessPolicies,
    parent_link: Some("group"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[Reference {
        path: FieldPath::Nested {
            object: "resources",
            field: "resource_group",
        },
        ..Reference::one("resources", ResourceKind::ResourceGroups)
    }],
    fields: &[
        FieldSchema {
            helper_text: Some(prefixed_name),
            ..NAME_FIELD
        },
        FieldSchema {
            default: Some(DefaultValue::StrList(&[])),
            ..FieldSchema::new("roles")
        },
        FieldSchema {
            optional: true,
            ..FieldSchema::new("resources")
        },
        FieldSchema {
            optional: true,
            groups: Some(|_, ctx| names_of(ctx, ResourceKind::ResourceGroups)),
            ..FieldSchema::new("resource_group")
        },
    ],
    disable_save: invalid_name,
};

// ============================================================================
// SECTION: Dynamic Policies
// ============================================================================

/// Dynamic membership rules owned by an access group.
pub static DYNAMIC_POLICIES: ResourceSchema = ResourceSchema {
    kind: ResourceKind::DynamicPolicies,
    parent_link: Some("group"),
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAME_FIELD,
        FieldSchema {
            invalid: Some(invalid_identity_provider),
            invalid_text: Some(|_, _| "Enter a valid identity provider URI".to_string()),
            ..FieldSchema::new("identity_provider")
        },
        FieldSchema {
            invalid: Some(|record, _| invalid_in_range(record, "expiration", EXPIRATION)),
            invalid_text: Some(|_, _| number_text(EXPIRATION)),
            ..FieldSchema::new("expiration")
        },
        FieldSchema {
            on_state_change: Some(|record| copy_condition(record, "claim")),
            ..FieldSchema::new("claim")
        },
        FieldSchema {
            groups: Some(|_, _| OPERATORS.map(operator_display).to_vec()),
            on_state_change: Some(|record| {
                let stored = operator_stored(str_field(record, "operator").unwrap_or_default());
                set_condition(record, "operator", Value::from(stored));
            }),
            on_render: Some(|record| {
                let stored = record
                    .get("conditions")
                    .and_then(|conditions| conditions.get("operator"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                operator_display(stored)
            }),
            ..FieldSchema::new("operator")
        },
        FieldSchema {
            on_state_change: Some(|record| copy_condition(record, "value")),
            ..FieldSchema::new("value")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["identity_provider", "expiration", "conditions"])
            || fields_invalid(record, ctx, &["identity_provider", "expiration"])
    },
};

fn invalid_identity_provider(record: &Record, _ctx: &SchemaContext<'_>) -> bool {
    any_missing(record, &["identity_provider"])
        || !is_valid_url(str_field(record, "identity_provider").unwrap_or_default())
}

/// Writes one entry of the `conditions` object, creating it when absent.
fn set_condition(record: &mut Record, field: &str, value: Value) {
    let mut conditions =
        record.get("conditions").and_then(Value::as_object).cloned().unwrap_or_default();
    conditions.insert(field.to_string(), value);
    record.insert("conditions".to_string(), Value::Object(conditions));
}

/// Copies a flat form field into `conditions`.
fn copy_condition(record: &mut Record, field: &str) {
    let value = record.get(field).cloned().unwrap_or(Value::Null);
    set_condition(record, field, value);
}

/// `NOT_EQUALS_IGNORE_CASE` becomes `Not Equals (Ignore Case)`.
#[must_use]
pub fn operator_display(stored: &str) -> String {
    let (base, ignore_case) = match stored.strip_suffix(IGNORE_CASE) {
        Some(base) => (base, true),
        None => (stored, false),
    };
    let mut words: Vec<String> = base
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
        })
        .collect();
    if ignore_case {
        words.push("(Ignore Case)".to_string());
    }
    words.join(" ")
}

/// `Not Equals (Ignore Case)` becomes `NOT_EQUALS_IGNORE_CASE`.
#[must_use]
pub fn operator_stored(display: &str) -> String {
    display
        .replace(['(', ')'], "")
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
