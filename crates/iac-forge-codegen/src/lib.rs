// crates/iac-forge-codegen/src/lib.rs
// ============================================================================
// Module: Code Generator Root
// Description: Compiles a configuration tree into Terraform text.
// Purpose: Run every resource family in a fixed order and join the output.
// Dependencies: iac-forge-core, tracing
// ============================================================================

//! ## Overview
//! Generation is a pure function of a [`ConfigTree`] snapshot. Each resource
//! family renders its records into banner-delimited sections through the
//! [`document`] model; [`generate`] runs the families in a fixed order and
//! joins whatever they produce.
//!
//! # Invariants
//! - Equal trees produce byte-identical output.
//! - Unresolvable references render as `"ERROR: Unfound Ref"` and never
//!   abort generation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod classic;
pub mod dns;
pub mod document;
pub mod iam;
pub mod naming;
pub mod network;
pub mod provider;
pub mod refs;
pub mod services;
pub mod units;

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::ConfigTree;
use tracing::debug;

pub use crate::document::BANNER;
pub use crate::document::UNFOUND_REF;
pub use crate::refs::Refs;

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Renders one family of sections.
type Stage = fn(&Refs<'_>) -> Option<String>;

/// Families in emission order: providers, resource groups, networking,
/// classic infrastructure, DNS, compute access, storage and security
/// services, IAM, and observability.
const PIPELINE: [(&str, Stage); 17] = [
    ("provider", provider::provider_tf),
    ("resource_groups", network::resource_group_tf),
    ("vpcs", network::vpc_tf),
    ("security_groups", network::security_group_tf),
    ("transit_gateways", network::tgw_tf),
    ("classic", classic::classic_infra_tf),
    ("dns", dns::dns_tf),
    ("ssh_keys", network::ssh_key_tf),
    ("key_management", services::kms_tf),
    ("object_storage", services::cos_tf),
    ("icd", services::icd_tf),
    ("event_streams", services::event_streams_tf),
    ("secrets_manager", services::secrets_manager_tf),
    ("appid", services::appid_tf),
    ("iam_account_settings", iam::iam_account_settings_tf),
    ("access_groups", iam::access_group_tf),
    ("atracker", services::atracker_tf),
];

/// Compiles `tree` into Terraform text.
///
/// Returns `None` when no family produced a section. Output ends with
/// exactly one newline.
#[must_use]
pub fn generate(tree: &ConfigTree) -> Option<String> {
    let refs = Refs::new(tree);
    let sections: Vec<String> = PIPELINE
        .iter()
        .filter_map(|(family, stage)| {
            let rendered = stage(&refs);
            debug!(family = *family, emitted = rendered.is_some(), "rendered family");
            rendered
        })
        .collect();
    if sections.is_empty() {
        return None;
    }
    let mut output = sections.join("\n");
    let trimmed = output.trim_end_matches('\n').len();
    output.truncate(trimmed);
    output.push('\n');
    Some(output)
}

/// Renders a single family by pipeline name.
///
/// Returns `None` for unknown names and for families with nothing to emit.
#[must_use]
pub fn generate_family(tree: &ConfigTree, family: &str) -> Option<String> {
    let refs = Refs::new(tree);
    PIPELINE.iter().find(|(name, _)| *name == family).and_then(|(_, stage)| stage(&refs))
}

/// Pipeline family names in emission order.
#[must_use]
pub fn families() -> Vec<&'static str> {
    PIPELINE.iter().map(|(family, _)| *family).collect()
}
