// crates/iac-forge-codegen/src/refs.rs
// ============================================================================
// Module: Reference Encoding
// Description: Terraform addresses for records referenced by name.
// Purpose: Turn stored relationship names into managed or data references.
// Dependencies: iac-forge-core
// ============================================================================

//! ## Overview
//! Records store relationships as target names. [`Refs`] resolves a name
//! against the tree and encodes the address of the generated resource,
//! prefixing `data.` when the target is imported with `use_data`.
//!
//! # Invariants
//! - A missing or unresolvable name yields [`Expr::Unfound`], never a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::ConfigTree;
use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::bool_field;
use iac_forge_core::find;
use iac_forge_core::non_empty_str;
use iac_forge_core::str_field;
use iac_forge_core::str_list;

use crate::document::Expr;
use crate::naming::snake_case;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix used when the options singleton is missing.
const DEFAULT_PREFIX: &str = "iac";

/// Region used when the options singleton is missing.
const DEFAULT_REGION: &str = "us-south";

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Borrowed view over a tree snapshot used while rendering.
#[derive(Debug, Clone, Copy)]
pub struct Refs<'a> {
    tree: &'a ConfigTree,
}

impl<'a> Refs<'a> {
    /// Wraps a tree.
    #[must_use]
    pub const fn new(tree: &'a ConfigTree) -> Self {
        Self {
            tree,
        }
    }

    /// Returns the wrapped tree.
    #[must_use]
    pub const fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    /// Returns the options singleton, if any.
    #[must_use]
    pub fn options(&self) -> Option<&'a Record> {
        self.tree.singleton(ResourceKind::Options)
    }

    /// Literal deployment prefix.
    #[must_use]
    pub fn prefix(&self) -> &'a str {
        self.options().and_then(|options| non_empty_str(options, "prefix")).unwrap_or(DEFAULT_PREFIX)
    }

    /// Literal deployment region.
    #[must_use]
    pub fn region(&self) -> &'a str {
        self.options().and_then(|options| non_empty_str(options, "region")).unwrap_or(DEFAULT_REGION)
    }

    /// Deployment tags as a list literal.
    #[must_use]
    pub fn tags(&self) -> Expr {
        Expr::str_list(self.options().map(|options| str_list(options, "tags")).unwrap_or_default())
    }

    /// `"<prefix>-<name>"` with the literal prefix.
    #[must_use]
    pub fn prefixed(&self, name: &str) -> Expr {
        Expr::str(format!("{}-{name}", self.prefix()))
    }

    /// Name for a resource that may be imported: imported names are used
    /// as-is, managed names get the `${var.prefix}` interpolation.
    #[must_use]
    pub fn data_name(record: &Record) -> Expr {
        let name = str_field(record, "name").unwrap_or_default();
        if bool_field(record, "use_data") {
            Expr::str(name)
        } else {
            var_prefixed(name)
        }
    }

    /// Resolves `name` to a record of `kind`.
    #[must_use]
    pub fn lookup(&self, kind: ResourceKind, name: Option<&str>) -> Option<&'a Record> {
        name.filter(|name| !name.is_empty()).and_then(|name| find(self.tree, kind, None, name))
    }

    /// `[data.]ibm_resource_group.<rg>.id`.
    #[must_use]
    pub fn resource_group_id(&self, name: Option<&str>) -> Expr {
        self.lookup(ResourceKind::ResourceGroups, name).map_or(Expr::Unfound, |group| {
            address(group, "ibm_resource_group", "", "id")
        })
    }

    /// `module.<vpc>_vpc.<output>`.
    #[must_use]
    pub fn vpc_module(&self, name: Option<&str>, output: &str) -> Expr {
        self.lookup(ResourceKind::Vpcs, name).map_or(Expr::Unfound, |vpc| {
            Expr::raw(format!("module.{}_vpc.{output}", snake_case(record_label(vpc))))
        })
    }

    /// `[data.]ibm_resource_instance.<kms>.guid`.
    #[must_use]
    pub fn kms_guid(&self, name: Option<&str>) -> Expr {
        self.lookup(ResourceKind::KeyManagement, name).map_or(Expr::Unfound, |kms| {
            address(kms, "ibm_resource_instance", "", "guid")
        })
    }

    /// `ibm_kms_key.<kms>_<key>_key.crn` when the key exists in that instance.
    #[must_use]
    pub fn key_crn(&self, kms: Option<&str>, key: Option<&str>) -> Expr {
        match (kms, key) {
            (Some(kms), Some(key)) if find(self.tree, ResourceKind::EncryptionKeys, Some(kms), key).is_some() => {
                Expr::raw(format!("ibm_kms_key.{}.crn", key_label(kms, key)))
            }
            _ => Expr::Unfound,
        }
    }

    /// `[data.]ibm_resource_instance.<cos>_object_storage.<output>`.
    #[must_use]
    pub fn cos_instance(&self, name: Option<&str>, output: &str) -> Expr {
        self.lookup(ResourceKind::ObjectStorage, name).map_or(Expr::Unfound, |cos| {
            address(cos, "ibm_resource_instance", "_object_storage", output)
        })
    }

    /// Finds the object storage instance that owns `bucket`.
    #[must_use]
    pub fn bucket_owner(&self, bucket: Option<&str>) -> Option<&'a str> {
        let bucket = bucket.filter(|bucket| !bucket.is_empty())?;
        self.tree
            .located(ResourceKind::Buckets)
            .into_iter()
            .find(|entry| str_field(entry.record, "name") == Some(bucket))
            .and_then(|entry| entry.parent)
    }

    /// Finds the object storage instance that owns the credential `key`.
    #[must_use]
    pub fn cos_key_owner(&self, key: Option<&str>) -> Option<&'a str> {
        let key = key.filter(|key| !key.is_empty())?;
        self.tree
            .located(ResourceKind::CosKeys)
            .into_iter()
            .find(|entry| str_field(entry.record, "name") == Some(key))
            .and_then(|entry| entry.parent)
    }

    /// `ibm_cos_bucket.<cos>_object_storage_<bucket>_bucket.<output>`.
    #[must_use]
    pub fn bucket(&self, bucket: Option<&str>, output: &str) -> Expr {
        match (self.bucket_owner(bucket), bucket) {
            (Some(cos), Some(bucket)) => {
                Expr::raw(format!("ibm_cos_bucket.{}.{output}", bucket_label(cos, bucket)))
            }
            _ => Expr::Unfound,
        }
    }

    /// True when `_options.<flag>` is set.
    #[must_use]
    pub fn option_enabled(&self, flag: &str) -> bool {
        self.options().is_some_and(|options| bool_field(options, flag))
    }
}

// ============================================================================
// SECTION: Labels
// ============================================================================

/// `"${var.prefix}-<name>"`.
#[must_use]
pub fn var_prefixed(name: &str) -> Expr {
    Expr::str(format!("${{var.prefix}}-{name}"))
}

/// Resource label of an encryption key.
#[must_use]
pub fn key_label(kms: &str, key: &str) -> String {
    snake_case(&format!("{kms} {key} key"))
}

/// Resource label of a bucket.
#[must_use]
pub fn bucket_label(cos: &str, bucket: &str) -> String {
    snake_case(&format!("{cos} object storage {bucket} bucket"))
}

/// Resource label of a subnet.
#[must_use]
pub fn subnet_label(vpc: &str, subnet: &str) -> String {
    snake_case(&format!("{vpc} {subnet}"))
}

/// The record's `name`, or an empty string.
#[must_use]
pub fn record_label(record: &Record) -> &str {
    str_field(record, "name").unwrap_or_default()
}

/// `[data.]<resource>.<name><suffix>.<output>` for a resolved record.
fn address(record: &Record, resource: &str, suffix: &str, output: &str) -> Expr {
    let data = if bool_field(record, "use_data") { "data." } else { "" };
    Expr::raw(format!("{data}{resource}.{}{suffix}.{output}", snake_case(record_label(record))))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;

    use super::*;

    fn tree(value: Value) -> ConfigTree {
        match value {
            Value::Object(map) => ConfigTree::from_map(map),
            _ => ConfigTree::new(),
        }
    }

    #[test]
    fn imported_targets_get_a_data_prefix() {
        let tree = tree(json!({
            "resource_groups": [{"name": "slz-service-rg", "use_data": true}, {"name": "workload-rg"}]
        }));
        let refs = Refs::new(&tree);
        assert_eq!(
            refs.resource_group_id(Some("slz-service-rg")),
            Expr::raw("data.ibm_resource_group.slz_service_rg.id")
        );
        assert_eq!(refs.resource_group_id(Some("workload-rg")), Expr::raw("ibm_resource_group.workload_rg.id"));
    }

    #[test]
    fn missing_targets_are_unfound() {
        let tree = tree(json!({"resource_groups": [], "object_storage": []}));
        let refs = Refs::new(&tree);
        assert_eq!(refs.resource_group_id(None), Expr::Unfound);
        assert_eq!(refs.resource_group_id(Some("frog")), Expr::Unfound);
        assert_eq!(refs.bucket(Some("logs"), "bucket_name"), Expr::Unfound);
        assert_eq!(refs.key_crn(Some("kms"), None), Expr::Unfound);
    }

    #[test]
    fn buckets_resolve_through_their_owner() {
        let tree = tree(json!({
            "object_storage": [{"name": "atracker-cos", "buckets": [{"name": "logs"}], "keys": []}]
        }));
        let refs = Refs::new(&tree);
        assert_eq!(
            refs.bucket(Some("logs"), "bucket_name"),
            Expr::raw("ibm_cos_bucket.atracker_cos_object_storage_logs_bucket.bucket_name")
        );
        assert_eq!(refs.prefix(), "iac");
    }
}
