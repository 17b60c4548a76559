// crates/iac-forge-codegen/src/iam.rs
// ============================================================================
// Module: IAM Generators
// Description: Account settings, access groups, policies, dynamic rules, and
//              user invites.
// Purpose: Emit identity and access configuration.
// Dependencies: iac-forge-core, serde_json
// ============================================================================

//! ## Overview
//! Account settings are emitted only when enabled, and only the settings
//! that carry a value. Each access group gets its own section holding its
//! policies, dynamic rules, and invites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::bool_field;
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
use crate::refs::var_prefixed;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Account settings copied into the resource when set, in emission order.
const ACCOUNT_SETTINGS: [&str; 9] = [
    "mfa",
    "allowed_ip_addresses",
    "include_history",
    "if_match",
    "max_sessions_per_identity",
    "restrict_create_service_id",
    "restrict_create_platform_apikey",
    "session_expiration_in_seconds",
    "session_invalidation_in_seconds",
];

/// Policy resource attributes passed through as strings.
const POLICY_RESOURCE_FIELDS: [&str; 4] = ["resource_type", "resource", "service", "resource_instance_id"];

// ============================================================================
// SECTION: Account Settings
// ============================================================================

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

/// Formats the account settings resource when enabled.
#[must_use]
pub fn format_iam_account_settings(settings: &Record) -> Option<Block> {
    if !bool_field(settings, "enable") {
        return None;
    }
    let block = Block::resource("ibm_iam_account_settings", "iam_account_settings");
    Some(ACCOUNT_SETTINGS.iter().fold(block, |block, field| {
        block.attr_opt(field, settings.get(*field).filter(|value| is_set(value)).and_then(Expr::from_json))
    }))
}

/// IAM account settings section.
#[must_use]
pub fn iam_account_settings_tf(refs: &Refs<'_>) -> Option<String> {
    let block = refs.tree().singleton(ResourceKind::IamAccountSettings).and_then(format_iam_account_settings);
    render_sections(Section::non_empty("IAM Account Settings", block.into_iter().collect()))
}

// ============================================================================
// SECTION: Access Groups
// ============================================================================

fn group_label(group: &str) -> String {
    format!("{}_access_group", snake_case(group))
}

fn group_id(group: &str) -> Expr {
    Expr::raw(format!("ibm_iam_access_group.{}.id", group_label(group)))
}

/// Formats the access group itself.
#[must_use]
pub fn format_access_group(group: &Record) -> Block {
    let name = record_label(group);
    Block::resource("ibm_iam_access_group", group_label(name))
        .attr("name", var_prefixed(&format!("{name}-ag")))
        .attr_opt("description", non_empty_str(group, "description").map(Expr::str))
}

/// Formats a policy of `group`.
#[must_use]
pub fn format_access_group_policy(group: &str, policy: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(policy);
    let resources = policy.get("resources").and_then(Value::as_object).map(|resources| {
        let scoped = non_empty_str(resources, "resource_group")
            .map(|resource_group| refs.resource_group_id(Some(resource_group)));
        POLICY_RESOURCE_FIELDS.iter().fold(
            Block::nested("resources").attr_opt("resource_group_id", scoped),
            |block, field| block.attr_opt(field, non_empty_str(resources, field).map(Expr::str)),
        )
    });
    Block::resource("ibm_iam_access_group_policy", snake_case(&format!("{group} {name} policy")))
        .attr("access_group_id", group_id(group))
        .attr("roles", Expr::str_list(str_list(policy, "roles")))
        .block_opt(resources)
}

/// Formats a dynamic membership rule of `group`.
#[must_use]
pub fn format_access_group_dynamic_rule(group: &str, rule: &Record) -> Block {
    let name = record_label(rule);
    let conditions = rule.get("conditions").and_then(Value::as_object);
    let condition = |field: &str| {
        Expr::str(conditions.and_then(|conditions| str_field(conditions, field)).unwrap_or_default())
    };
    Block::resource("ibm_iam_access_group_dynamic_rule", snake_case(&format!("{group} {name} dynamic rule")))
        .attr("name", var_prefixed(&format!("{group}-{name}-dynamic-rule")))
        .attr("access_group_id", group_id(group))
        .attr_opt("expiration", rule.get("expiration").and_then(Expr::from_json))
        .attr("identity_provider", Expr::str(str_field(rule, "identity_provider").unwrap_or_default()))
        .block(
            Block::nested("conditions")
                .attr("claim", condition("claim"))
                .attr("operator", condition("operator"))
                .attr("value", condition("value")),
        )
}

/// Formats the invite resource when the group invites users.
#[must_use]
pub fn format_access_group_invites(group: &Record) -> Option<Block> {
    if !bool_field(group, "has_invites") {
        return None;
    }
    let invites = group.get("invites").and_then(Value::as_object)?;
    let users = str_list(invites, "ibm_ids");
    if users.is_empty() {
        return None;
    }
    let name = record_label(group);
    Some(
        Block::resource("ibm_iam_user_invite", format!("{}_invites", snake_case(name)))
            .attr("users", Expr::str_list(users))
            .attr("access_groups", Expr::List(vec![group_id(name)])),
    )
}

fn children<'a>(record: &'a Record, field: &str) -> Vec<&'a Record> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|records| records.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// One section per access group.
#[must_use]
pub fn access_group_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::AccessGroups).into_iter().map(|group| {
        let name = record_label(group);
        let mut blocks = vec![format_access_group(group)];
        blocks.extend(
            children(group, "policies").into_iter().map(|policy| format_access_group_policy(name, policy, refs)),
        );
        blocks.extend(
            children(group, "dynamic_policies").into_iter().map(|rule| format_access_group_dynamic_rule(name, rule)),
        );
        blocks.extend(format_access_group_invites(group));
        Section::new(format!("{} Access Group", title_case(name)), blocks)
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
