// crates/iac-forge-core/src/fixup.rs
// ============================================================================
// Module: Reference Fixup
// Description: Generic reconciliation of name-valued references.
// Purpose: Keep relationship fields consistent across save, rename, and delete.
// Dependencies: tracing, crate::{kind, reference, schema, tree}
// ============================================================================

//! ## Overview
//! Every relationship in the tree is declared once in the schema registry's
//! reference table. This module is the only code that walks that table:
//!
//! - [`reconcile_record`] clears references in one record that no longer
//!   resolve (single names become null, lists are filtered, array elements
//!   are dropped).
//! - [`reconcile_children`] does the same for the children of one record,
//!   whose parent-scoped references depend on the parent's fields.
//! - [`cascade_rename`] rewrites every reference equal to an old name.
//! - [`cascade_delete`] clears every reference equal to a removed name, for
//!   the removed record and each of its children.
//!
//! # Invariants
//! - Every routine is idempotent: a second run over its own output changes
//!   nothing.
//! - Only fields declared in the reference table are touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::kind::Location;
use crate::kind::ResourceKind;
use crate::reference::find;
use crate::schema::Arity;
use crate::schema::FieldPath;
use crate::schema::Reference;
use crate::schema::Scope;
use crate::schema::references_to;
use crate::schema::schema_for;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::non_empty_str;
use crate::tree::record_name;

// ============================================================================
// SECTION: Name Rewriting
// ============================================================================

/// What to do with one referenced name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    /// Leave the name in place.
    Keep,
    /// Replace the name.
    Replace(String),
    /// Clear the name (null, filtered, or dropped element).
    Drop,
}

/// Applies `decide` to every name held at the reference's path.
///
/// Empty strings and non-string values are always kept. Returns true when the
/// record changed.
fn rewrite<F>(record: &mut Record, reference: &Reference, decide: F) -> bool
where
    F: Fn(&str) -> Outcome,
{
    match reference.path {
        FieldPath::Field(field) => {
            record.get_mut(field).is_some_and(|value| rewrite_value(value, reference.arity, &decide))
        }
        FieldPath::Nested {
            object,
            field,
        } => record
            .get_mut(object)
            .and_then(Value::as_object_mut)
            .and_then(|object| object.get_mut(field))
            .is_some_and(|value| rewrite_value(value, reference.arity, &decide)),
        FieldPath::Each {
            array,
            field,
        } => {
            let Some(elements) = record.get_mut(array).and_then(Value::as_array_mut) else {
                return false;
            };
            let before = elements.len();
            let mut changed = false;
            elements.retain_mut(|element| {
                let Some(value) = element.as_object_mut().and_then(|element| element.get_mut(field))
                else {
                    return true;
                };
                match value.as_str().filter(|name| !name.is_empty()).map(&decide) {
                    Some(Outcome::Drop) => false,
                    Some(Outcome::Replace(name)) => {
                        *value = Value::from(name);
                        changed = true;
                        true
                    }
                    Some(Outcome::Keep) | None => true,
                }
            });
            changed || elements.len() != before
        }
    }
}

/// Rewrites a single name or a list of names.
fn rewrite_value<F>(value: &mut Value, arity: Arity, decide: &F) -> bool
where
    F: Fn(&str) -> Outcome,
{
    match arity {
        Arity::One => {
            let outcome = value.as_str().filter(|name| !name.is_empty()).map(decide);
            match outcome {
                Some(Outcome::Drop) => {
                    *value = Value::Null;
                    true
                }
                Some(Outcome::Replace(name)) => {
                    *value = Value::from(name);
                    true
                }
                Some(Outcome::Keep) | None => false,
            }
        }
        Arity::Many => {
            let Some(names) = value.as_array_mut() else {
                return false;
            };
            let before = names.clone();
            names.retain_mut(|entry| {
                let outcome = entry.as_str().filter(|name| !name.is_empty()).map(decide);
                match outcome {
                    Some(Outcome::Drop) => false,
                    Some(Outcome::Replace(name)) => {
                        *entry = Value::from(name);
                        true
                    }
                    Some(Outcome::Keep) | None => true,
                }
            });
            *names != before
        }
    }
}

// ============================================================================
// SECTION: Scope Resolution
// ============================================================================

/// Returns the parent name that candidate targets must live under.
///
/// `Ok(None)` means any parent; `Err(())` means the scope cannot be resolved
/// and no target is acceptable.
fn target_parent<'a>(
    tree: &'a ConfigTree,
    holder_kind: ResourceKind,
    holder_parent: Option<&'a str>,
    holder: &'a Record,
    scope: Scope,
) -> Result<Option<&'a str>, ()> {
    match scope {
        Scope::Global => Ok(None),
        Scope::Sibling => Ok(holder_parent),
        Scope::Field(field) => non_empty_str(holder, field).map(Some).ok_or(()),
        Scope::ParentField(field) => {
            let parent_kind = holder_kind.parent().ok_or(())?;
            let parent_name = holder_parent.ok_or(())?;
            find(tree, parent_kind, None, parent_name)
                .and_then(|parent| non_empty_str(parent, field))
                .map(Some)
                .ok_or(())
        }
    }
}

/// True when a reference held by `holder` can denote a target under `parent`.
fn in_scope(
    tree: &ConfigTree,
    holder_kind: ResourceKind,
    holder_parent: Option<&str>,
    holder: &Record,
    reference: &Reference,
    parent: Option<&str>,
) -> bool {
    match target_parent(tree, holder_kind, holder_parent, holder, reference.scope) {
        Ok(None) => true,
        Ok(Some(scoped)) => parent.is_none() || parent == Some(scoped),
        Err(()) => false,
    }
}

// ============================================================================
// SECTION: Reconciliation
// ============================================================================

/// Clears every reference of `record` that does not resolve in `tree`.
///
/// References are processed in declaration order, so a scope field cleared by
/// an earlier reference empties the references scoped by it.
pub fn reconcile_record(
    tree: &ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    record: &mut Record,
) -> bool {
    let mut changed = false;
    for reference in schema_for(kind).references {
        let candidates: Vec<String> =
            match target_parent(tree, kind, parent, record, reference.scope) {
                Ok(scope) => tree
                    .names(reference.target, scope)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                Err(()) => Vec::new(),
            };
        let keep = reference.keep;
        changed |= rewrite(record, reference, |name| {
            if keep == Some(name) || candidates.iter().any(|candidate| candidate == name) {
                Outcome::Keep
            } else {
                Outcome::Drop
            }
        });
    }
    changed
}

/// Reconciles every record of every kind.
///
/// Returns true when anything changed.
pub fn reconcile_all(tree: &mut ConfigTree) -> bool {
    let mut changed = false;
    for kind in ResourceKind::ALL {
        if schema_for(kind).references.is_empty() {
            continue;
        }
        let snapshot = tree.clone();
        for (parent, record) in tree.located_mut(kind) {
            if reconcile_record(&snapshot, kind, parent.as_deref(), record) {
                debug!(kind = %kind, record = record_name(record).unwrap_or_default(), "reconciled references");
                changed = true;
            }
        }
    }
    changed
}

/// Reconciles the child records of the `kind` record named `name`.
///
/// Child references scoped by a parent field resolve against the parent as
/// stored in `tree`, so this runs after the parent is written back.
pub fn reconcile_children(tree: &mut ConfigTree, kind: ResourceKind, name: &str) -> bool {
    let mut changed = false;
    for child in kind.children() {
        if schema_for(child).references.is_empty() {
            continue;
        }
        let snapshot = tree.clone();
        for (parent, record) in tree.located_mut(child) {
            if parent.as_deref() == Some(name)
                && reconcile_record(&snapshot, child, Some(name), record)
            {
                debug!(
                    kind = %child,
                    parent = name,
                    record = record_name(record).unwrap_or_default(),
                    "reconciled child references"
                );
                changed = true;
            }
        }
    }
    changed
}

// ============================================================================
// SECTION: Cascades
// ============================================================================

/// Rewrites every reference to the `kind` record `old` (under `parent`) to `new`.
pub fn cascade_rename(
    tree: &mut ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    old: &str,
    new: &str,
) -> usize {
    let updated = rewrite_references(tree, kind, parent, |name| {
        if name == old {
            Outcome::Replace(new.to_string())
        } else {
            Outcome::Keep
        }
    });
    if updated > 0 {
        info!(kind = %kind, old, new, updated, "cascaded rename");
    }
    updated
}

/// Clears every reference to a removed record and to each of its children.
///
/// Children are processed before the record itself.
pub fn cascade_delete(
    tree: &mut ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    removed: &Record,
) -> usize {
    let Some(name) = record_name(removed) else {
        return 0;
    };
    let mut updated = 0;
    for child in kind.children() {
        let Some(field) = child_field(child) else {
            continue;
        };
        let children: Vec<String> = removed
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(record_name)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        for child_name in &children {
            updated += clear_references(tree, child, Some(name), child_name);
        }
    }
    updated += clear_references(tree, kind, parent, name);
    if updated > 0 {
        info!(kind = %kind, name, updated, "cascaded delete");
    }
    updated
}

/// Field on the parent record that holds records of a nested kind.
fn child_field(kind: ResourceKind) -> Option<&'static str> {
    match kind.location() {
        Location::Nested {
            field, ..
        } => Some(field),
        Location::Collection | Location::Singleton => None,
    }
}

fn clear_references(
    tree: &mut ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> usize {
    rewrite_references(
        tree,
        kind,
        parent,
        |candidate| {
            if candidate == name { Outcome::Drop } else { Outcome::Keep }
        },
    )
}

/// Applies `decide` to every in-scope reference targeting `kind`.
fn rewrite_references<F>(
    tree: &mut ConfigTree,
    kind: ResourceKind,
    parent: Option<&str>,
    decide: F,
) -> usize
where
    F: Fn(&str) -> Outcome,
{
    let referencing = references_to(kind);
    if referencing.is_empty() {
        return 0;
    }
    let snapshot = tree.clone();
    let mut updated = 0;
    for (holder_kind, reference) in referencing {
        for (holder_parent, holder) in tree.located_mut(holder_kind) {
            let holder_parent = holder_parent.as_deref();
            let scoped =
                in_scope(&snapshot, holder_kind, holder_parent, holder, reference, parent);
            if scoped && rewrite(holder, reference, &decide) {
                updated += 1;
            }
        }
    }
    updated
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::object;

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_map(object(value))
    }

    #[test]
    fn scoped_list_empties_when_scope_field_clears() {
        let tree = tree(json!({
            "vpcs": [{"name": "management", "subnets": [{"name": "vsi-zone-1"}]}],
            "dns": [{"name": "dev", "zones": [], "records": [], "custom_resolvers": []}]
        }));
        let mut resolver = object(json!({
            "name": "zzzz",
            "vpc": "bad",
            "subnets": ["vsi-zone-1"],
            "zone": null
        }));
        assert!(reconcile_record(&tree, ResourceKind::DnsCustomResolvers, Some("dev"), &mut resolver));
        assert_eq!(resolver["vpc"], Value::Null);
        assert_eq!(resolver["subnets"], json!([]));
        assert_eq!(resolver["zone"], Value::Null);
    }

    #[test]
    fn sentinel_bucket_is_kept() {
        let tree = tree(json!({"object_storage": []}));
        let mut vpc = object(json!({"name": "edge", "bucket": "$disabled", "resource_group": null}));
        assert!(!reconcile_record(&tree, ResourceKind::Vpcs, None, &mut vpc));
        assert_eq!(vpc["bucket"], json!("$disabled"));
    }

    #[test]
    fn children_follow_the_parent_scope_field() {
        let mut tree = tree(json!({
            "key_management": [
                {"name": "a", "keys": [{"name": "k1"}]},
                {"name": "b", "keys": [{"name": "k2"}]}
            ],
            "object_storage": [
                {"name": "cos", "kms": "b", "buckets": [{"name": "bkt", "kms_key": "k1"}], "keys": []}
            ]
        }));
        assert!(reconcile_children(&mut tree, ResourceKind::ObjectStorage, "cos"));
        let cos = tree.top_level(ResourceKind::ObjectStorage);
        assert_eq!(cos[0]["buckets"][0]["kms_key"], Value::Null);
        assert!(!reconcile_children(&mut tree, ResourceKind::ObjectStorage, "cos"));
    }

    #[test]
    fn dangling_connections_are_dropped() {
        let tree = tree(json!({"vpcs": [{"name": "management"}]}));
        let mut tgw = object(json!({
            "name": "tgw",
            "connections": [{"tgw": "tgw", "vpc": "management"}, {"tgw": "tgw", "vpc": "gone"}]
        }));
        assert!(reconcile_record(&tree, ResourceKind::TransitGateways, None, &mut tgw));
        assert_eq!(tgw["connections"], json!([{"tgw": "tgw", "vpc": "management"}]));
    }

    #[test]
    fn rename_respects_parent_scope() {
        let mut tree = tree(json!({
            "key_management": [
                {"name": "kms", "keys": [{"name": "key"}]},
                {"name": "other", "keys": [{"name": "key"}]}
            ],
            "secrets_manager": [
                {"name": "a", "kms": "kms", "encryption_key": "key"},
                {"name": "b", "kms": "other", "encryption_key": "key"}
            ]
        }));
        let updated = cascade_rename(&mut tree, ResourceKind::EncryptionKeys, Some("kms"), "key", "renamed");
        assert_eq!(updated, 1);
        let managers = tree.top_level(ResourceKind::SecretsManager);
        assert_eq!(managers[0]["encryption_key"], json!("renamed"));
        assert_eq!(managers[1]["encryption_key"], json!("key"));
    }

    #[test]
    fn delete_clears_child_references_first() {
        let mut tree = tree(json!({
            "object_storage": [],
            "atracker": {"bucket": "logs", "cos_key": "writer", "locations": []}
        }));
        let removed = object(json!({
            "name": "cos",
            "buckets": [{"name": "logs"}],
            "keys": [{"name": "writer"}]
        }));
        assert_eq!(cascade_delete(&mut tree, ResourceKind::ObjectStorage, None, &removed), 2);
        let atracker = tree.singleton(ResourceKind::Atracker);
        assert_eq!(atracker.and_then(|record| record.get("bucket")), Some(&Value::Null));
        assert_eq!(atracker.and_then(|record| record.get("cos_key")), Some(&Value::Null));
    }
}
