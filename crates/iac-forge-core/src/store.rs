// crates/iac-forge-core/src/store.rs
// ============================================================================
// Module: Configuration Store
// Description: Mutex-guarded configuration tree with CRUD and change notification.
// Purpose: Own the tree and keep names unique and references consistent.
// Dependencies: serde_json, thiserror, tracing, crate::{fixup, kind, schema, tree}
// ============================================================================

//! ## Overview
//! [`ConfigStore`] is the single writer of the configuration tree. Every
//! mutation is routed through the schema registry: defaults and hooks come
//! from [`schema_for`], references are reconciled by the generic fixup
//! routines, and exactly one update callback fires per mutation while the
//! tree lock is still held.
//!
//! # Invariants
//! - Every record has a string name, unique among its siblings after any
//!   sequence of successful creates and saves.
//! - Children of a saved record are reconciled against the saved fields.
//! - A failed create or save leaves the tree unchanged and notifies nobody.
//! - Observers never see a partially applied mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::OpContext;
use crate::fixup::cascade_delete;
use crate::fixup::cascade_rename;
use crate::fixup::reconcile_all;
use crate::fixup::reconcile_children;
use crate::fixup::reconcile_record;
use crate::kind::Location;
use crate::kind::ResourceKind;
use crate::schema::SchemaError;
use crate::schema::schema_for;
use crate::schema::should_disable_save;
use crate::schema::verify_registry;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::record_name;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Observer invoked once per mutation with the updated tree.
pub type UpdateCallback = Arc<dyn Fn(&ConfigTree) + Send + Sync>;

/// Errors raised by store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A sibling record already uses the name.
    #[error("{kind} named {name} already exists")]
    DuplicateName {
        /// Kind of the colliding record.
        kind: ResourceKind,
        /// Colliding name.
        name: String,
    },
    /// The record has no string `name`.
    #[error("{kind} records require a string name")]
    MissingName {
        /// Kind of the nameless record.
        kind: ResourceKind,
    },
    /// The targeted record or parent does not exist.
    #[error("{kind} named {name} not found")]
    NotFound {
        /// Kind that was searched.
        kind: ResourceKind,
        /// Name that was searched for.
        name: String,
    },
    /// A nested kind was addressed without a parent record.
    #[error("{kind} requires a parent record")]
    MissingParent {
        /// Nested kind.
        kind: ResourceKind,
    },
    /// The operation does not apply to the kind.
    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        /// Addressed kind.
        kind: ResourceKind,
        /// Rejected operation.
        operation: &'static str,
    },
    /// The tree lock was poisoned by a panicking writer.
    #[error("configuration store lock poisoned")]
    Poisoned,
    /// The schema registry is inconsistent.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Single-writer owner of the configuration tree.
pub struct ConfigStore {
    /// Guarded tree.
    tree: Mutex<ConfigTree>,
    /// Registered observer.
    callback: Mutex<Option<UpdateCallback>>,
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the default tree every new store starts from.
///
/// Top-level kinds with an init hook get their seeded records; every other
/// top-level collection starts empty.
#[must_use]
pub fn default_tree() -> ConfigTree {
    let mut tree = ConfigTree::new();
    fill_missing(&mut tree);
    tree
}

/// Initializes every top-level key the tree does not have yet.
fn fill_missing(tree: &mut ConfigTree) {
    for kind in ResourceKind::ALL.into_iter().filter(|kind| kind.is_top_level()) {
        if tree.contains_key(kind.as_str()) {
            continue;
        }
        match (schema_for(kind).init, kind.location()) {
            (Some(init), _) => init(tree),
            (None, Location::Collection) => tree.set(kind.as_str(), Value::Array(Vec::new())),
            (None, Location::Singleton | Location::Nested { .. }) => {}
        }
    }
}

impl ConfigStore {
    /// Creates a store holding the default tree.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when the registry is inconsistent.
    pub fn new() -> Result<Self, StoreError> {
        Self::from_tree(ConfigTree::new())
    }

    /// Creates a store around a loaded tree, initializing missing keys.
    ///
    /// References are not reconciled here; call [`Self::reconcile_all`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when the registry is inconsistent.
    pub fn from_tree(mut tree: ConfigTree) -> Result<Self, StoreError> {
        verify_registry()?;
        fill_missing(&mut tree);
        Ok(Self {
            tree: Mutex::new(tree),
            callback: Mutex::new(None),
        })
    }

    /// Registers the observer, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the callback lock is poisoned.
    pub fn set_update_callback<F>(&self, callback: F) -> Result<(), StoreError>
    where
        F: Fn(&ConfigTree) + Send + Sync + 'static,
    {
        let mut slot = self.callback.lock().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(Arc::new(callback));
        Ok(())
    }

    // ========================================================================
    // SECTION: Reads
    // ========================================================================

    /// Returns a copy of the current tree.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the tree lock is poisoned.
    pub fn snapshot(&self) -> Result<ConfigTree, StoreError> {
        self.read(ConfigTree::clone)
    }

    /// Runs `f` against the current tree under the lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the tree lock is poisoned.
    pub fn read<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&ConfigTree) -> R,
    {
        let tree = self.lock()?;
        Ok(f(&tree))
    }

    /// Answers whether `record` must not be saved as edited.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the tree lock is poisoned.
    pub fn should_disable_save(
        &self,
        kind: ResourceKind,
        record: &Record,
        ctx: &OpContext,
    ) -> Result<bool, StoreError> {
        self.read(|tree| should_disable_save(kind, record, tree, ctx))
    }

    // ========================================================================
    // SECTION: Mutations
    // ========================================================================

    /// Appends a new record built from the kind's defaults and `fields`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unsupported`] for singleton kinds.
    /// - [`StoreError::MissingParent`] when a nested kind has no `ctx.parent`.
    /// - [`StoreError::MissingName`] when the record has no string name.
    /// - [`StoreError::NotFound`] when the parent record does not exist.
    /// - [`StoreError::DuplicateName`] when a sibling already has the name.
    pub fn create(
        &self,
        kind: ResourceKind,
        fields: Record,
        ctx: &OpContext,
    ) -> Result<(), StoreError> {
        if kind.location() == Location::Singleton {
            return Err(StoreError::Unsupported {
                kind,
                operation: "create",
            });
        }
        let parent = required_parent(kind, ctx)?;
        let schema = schema_for(kind);
        let mut record = schema.default_record();
        record.extend(fields);
        if let (Some(link), Some(parent)) = (schema.parent_link, parent) {
            record.insert(link.to_string(), Value::from(parent));
        }
        if let Some(hook) = schema.on_create {
            hook(&mut record);
        }

        let name = record_name(&record)
            .ok_or(StoreError::MissingName {
                kind,
            })?
            .to_string();
        let mut tree = self.lock()?;
        if tree.names(kind, parent).contains(&name.as_str()) {
            return Err(StoreError::DuplicateName {
                kind,
                name,
            });
        }
        let records = tree.collection_mut(kind, parent).ok_or_else(|| missing_parent(kind, parent))?;
        records.push(Value::Object(record));
        debug!(kind = %kind, name, parent = parent.unwrap_or_default(), "created record");
        self.notify(&tree)
    }

    /// Merges `fields` into the record named by `ctx`.
    ///
    /// Singleton kinds merge into the singleton object and ignore `ctx.name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingParent`] when a nested kind has no `ctx.parent`.
    /// - [`StoreError::NotFound`] when the record or its parent does not exist.
    /// - [`StoreError::MissingName`] when the merged record has no string name.
    /// - [`StoreError::DuplicateName`] when the new name collides with a sibling.
    pub fn save(
        &self,
        kind: ResourceKind,
        fields: Record,
        ctx: &OpContext,
    ) -> Result<(), StoreError> {
        let schema = schema_for(kind);
        let mut tree = self.lock()?;

        if kind.location() == Location::Singleton {
            let previous = tree.singleton(kind).cloned().unwrap_or_default();
            let mut merged = previous.clone();
            merged.extend(fields);
            if let Some(hook) = schema.on_save {
                hook(&mut tree, &previous, &mut merged);
            }
            reconcile_record(&tree, kind, None, &mut merged);
            tree.set(kind.as_str(), Value::Object(merged));
            debug!(kind = %kind, "saved singleton");
            return self.notify(&tree);
        }

        let parent = required_parent(kind, ctx)?;
        let old_name = ctx.name().unwrap_or_default();
        let siblings = tree.collection(kind, parent);
        let index = siblings
            .iter()
            .position(|record| record_name(record) == Some(old_name))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                name: old_name.to_string(),
            })?;
        let previous = siblings[index].clone();
        let mut merged = previous.clone();
        merged.extend(fields);

        let new_name = record_name(&merged)
            .ok_or(StoreError::MissingName {
                kind,
            })?
            .to_string();
        let renamed = new_name != old_name;
        if renamed && tree.names(kind, parent).contains(&new_name.as_str()) {
            return Err(StoreError::DuplicateName {
                kind,
                name: new_name,
            });
        }

        if let Some(hook) = schema.on_save {
            hook(&mut tree, &previous, &mut merged);
        }
        reconcile_record(&tree, kind, parent, &mut merged);
        if renamed {
            relink_children(kind, &mut merged, &new_name);
        }

        let records = tree.collection_mut(kind, parent).ok_or_else(|| missing_parent(kind, parent))?;
        if let Some(slot) = records
            .iter_mut()
            .filter(|value| value.is_object())
            .nth(index)
        {
            *slot = Value::Object(merged);
        }
        if renamed {
            cascade_rename(&mut tree, kind, parent, old_name, &new_name);
        }
        reconcile_children(&mut tree, kind, &new_name);
        debug!(kind = %kind, name = new_name, parent = parent.unwrap_or_default(), "saved record");
        self.notify(&tree)
    }

    /// Removes the record named by `ctx` and clears references to it.
    ///
    /// Deleting an absent record leaves the tree unchanged but still notifies.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unsupported`] for singleton kinds.
    /// - [`StoreError::MissingParent`] when a nested kind has no `ctx.parent`.
    pub fn delete(&self, kind: ResourceKind, ctx: &OpContext) -> Result<(), StoreError> {
        if kind.location() == Location::Singleton {
            return Err(StoreError::Unsupported {
                kind,
                operation: "delete",
            });
        }
        let parent = required_parent(kind, ctx)?;
        let name = ctx.name().unwrap_or_default();
        let mut tree = self.lock()?;

        let exists = tree.names(kind, parent).contains(&name);
        let removed = if exists {
            tree.collection_mut(kind, parent).and_then(|records| {
                records
                    .iter()
                    .position(|value| value.get("name").and_then(Value::as_str) == Some(name))
                    .map(|index| records.remove(index))
            })
        } else {
            None
        };
        match removed {
            Some(Value::Object(removed)) => {
                cascade_delete(&mut tree, kind, parent, &removed);
                debug!(kind = %kind, name, parent = parent.unwrap_or_default(), "deleted record");
            }
            _ => debug!(kind = %kind, name, "delete target absent"),
        }
        self.notify(&tree)
    }

    /// Reconciles every reference in the tree, typically after loading it.
    ///
    /// Returns true when anything changed. Always notifies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when a lock is poisoned.
    pub fn reconcile_all(&self) -> Result<bool, StoreError> {
        let mut tree = self.lock()?;
        let changed = reconcile_all(&mut tree);
        self.notify(&tree)?;
        Ok(changed)
    }

    // ========================================================================
    // SECTION: Internals
    // ========================================================================

    fn lock(&self) -> Result<MutexGuard<'_, ConfigTree>, StoreError> {
        self.tree.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Fires the observer with the tree lock still held by the caller.
    fn notify(&self, tree: &ConfigTree) -> Result<(), StoreError> {
        let callback = self.callback.lock().map_err(|_| StoreError::Poisoned)?.clone();
        if let Some(callback) = callback {
            callback(tree);
        }
        Ok(())
    }
}

/// Returns `ctx.parent` for nested kinds, failing when it is absent.
fn required_parent(kind: ResourceKind, ctx: &OpContext) -> Result<Option<&str>, StoreError> {
    match kind.location() {
        Location::Nested { .. } => ctx.parent().map(Some).ok_or(StoreError::MissingParent {
            kind,
        }),
        Location::Collection | Location::Singleton => Ok(None),
    }
}

fn missing_parent(kind: ResourceKind, parent: Option<&str>) -> StoreError {
    StoreError::NotFound {
        kind: kind.parent().unwrap_or(kind),
        name: parent.unwrap_or_default().to_string(),
    }
}

/// Points the parent-link field of every child record at the new name.
fn relink_children(kind: ResourceKind, record: &mut Record, name: &str) {
    for child in kind.children() {
        let (Location::Nested { field, .. }, Some(link)) =
            (child.location(), schema_for(child).parent_link)
        else {
            continue;
        };
        let Some(children) = record.get_mut(field).and_then(Value::as_array_mut) else {
            continue;
        };
        for child_record in children.iter_mut().filter_map(Value::as_object_mut) {
            child_record.insert(link.to_string(), Value::from(name));
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::panic_in_result_fn, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::schema::object;

    #[test]
    fn default_tree_seeds_every_top_level_key() {
        let tree = default_tree();
        for kind in ResourceKind::ALL.into_iter().filter(|kind| kind.is_top_level()) {
            assert!(tree.contains_key(kind.as_str()), "missing {kind}");
        }
        assert_eq!(
            tree.names(ResourceKind::ResourceGroups, None),
            vec!["service-rg", "management-rg", "workload-rg"]
        );
    }

    #[test]
    fn failed_create_does_not_notify() -> Result<(), StoreError> {
        let store = ConfigStore::new()?;
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);
        store.set_update_callback(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        })?;
        let result =
            store.create(ResourceKind::ResourceGroups, object(json!({"name": "service-rg"})), &OpContext::new());
        assert!(matches!(result, Err(StoreError::DuplicateName { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.delete(ResourceKind::ResourceGroups, &OpContext::editing("absent"))?;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn renaming_a_parent_relinks_children() {
        let mut record = object(json!({
            "name": "dev",
            "zones": [{"name": "zone", "instance": "old"}],
            "records": [{"name": "a"}]
        }));
        relink_children(ResourceKind::Dns, &mut record, "dev");
        assert_eq!(record["zones"][0]["instance"], json!("dev"));
        assert_eq!(record["records"][0], json!({"name": "a"}));
    }

    #[test]
    fn singletons_reject_create_and_delete() -> Result<(), StoreError> {
        let store = ConfigStore::new()?;
        assert!(matches!(
            store.create(ResourceKind::Atracker, Record::new(), &OpContext::new()),
            Err(StoreError::Unsupported { .. })
        ));
        assert!(matches!(
            store.delete(ResourceKind::Options, &OpContext::new()),
            Err(StoreError::Unsupported { .. })
        ));
        Ok(())
    }
}
