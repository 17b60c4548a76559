// crates/iac-forge-core/src/tree.rs
// ============================================================================
// Module: Configuration Tree
// Description: JSON-backed deployment description keyed by resource type.
// Purpose: Provide typed access to collections, singletons, and nested records.
// Dependencies: serde, serde_json, crate::kind
// ============================================================================

//! ## Overview
//! The configuration tree is a JSON object keyed by resource-type tag. Each
//! key holds an ordered array of records or a singleton record; nested kinds
//! live in array fields of their parent records. Records are plain JSON
//! objects so the tree serializes verbatim and round-trips through storage.
//!
//! # Invariants
//! - Collection order is insertion order and is never re-sorted here.
//! - Accessors never create keys; only the mutable collection accessor does.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::kind::Location;
use crate::kind::ResourceKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One named entry of a resource-type collection.
pub type Record = Map<String, Value>;

/// Rooted configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

/// A record together with the name of the parent record that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    /// Parent record name for nested kinds.
    pub parent: Option<&'a str>,
    /// Parent record for nested kinds.
    pub parent_record: Option<&'a Record>,
    /// The record itself.
    pub record: &'a Record,
}

// ============================================================================
// SECTION: Tree Access
// ============================================================================

impl ConfigTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON object.
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the tree and returns it as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Returns the raw value stored under a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true when the top-level key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Replaces the value stored under a top-level key.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Returns the singleton record of a singleton kind.
    #[must_use]
    pub fn singleton(&self, kind: ResourceKind) -> Option<&Record> {
        self.0.get(kind.as_str()).and_then(Value::as_object)
    }

    /// Returns the mutable singleton record of a singleton kind.
    pub fn singleton_mut(&mut self, kind: ResourceKind) -> Option<&mut Record> {
        self.0.get_mut(kind.as_str()).and_then(Value::as_object_mut)
    }

    /// Returns the records of a top-level collection in stored order.
    #[must_use]
    pub fn top_level(&self, kind: ResourceKind) -> Vec<&Record> {
        records_of(self.0.get(kind.as_str()))
    }

    /// Returns the records of `kind` under `parent`.
    ///
    /// For nested kinds with no parent, every record of the kind across all
    /// parents is returned. Singletons yield their single record.
    #[must_use]
    pub fn collection(&self, kind: ResourceKind, parent: Option<&str>) -> Vec<&Record> {
        self.located(kind)
            .into_iter()
            .filter(|entry| parent.is_none() || entry.parent == parent)
            .map(|entry| entry.record)
            .collect()
    }

    /// Returns every record of `kind` together with its owning parent.
    #[must_use]
    pub fn located(&self, kind: ResourceKind) -> Vec<Located<'_>> {
        match kind.location() {
            Location::Singleton => self
                .singleton(kind)
                .map(|record| Located {
                    parent: None,
                    parent_record: None,
                    record,
                })
                .into_iter()
                .collect(),
            Location::Collection => self
                .top_level(kind)
                .into_iter()
                .map(|record| Located {
                    parent: None,
                    parent_record: None,
                    record,
                })
                .collect(),
            Location::Nested {
                parent,
                field,
            } => self
                .top_level(parent)
                .into_iter()
                .flat_map(|parent_record| {
                    let parent_name = record_name(parent_record);
                    records_of(parent_record.get(field)).into_iter().map(move |record| Located {
                        parent: parent_name,
                        parent_record: Some(parent_record),
                        record,
                    })
                })
                .collect(),
        }
    }

    /// Returns the mutable array holding `kind` records under `parent`.
    ///
    /// Top-level arrays are created on demand. Nested arrays are created on
    /// demand inside an existing parent; a missing parent yields `None`.
    pub fn collection_mut(
        &mut self,
        kind: ResourceKind,
        parent: Option<&str>,
    ) -> Option<&mut Vec<Value>> {
        match kind.location() {
            Location::Singleton => None,
            Location::Collection => {
                let slot =
                    self.0.entry(kind.as_str()).or_insert_with(|| Value::Array(Vec::new()));
                slot.as_array_mut()
            }
            Location::Nested {
                parent: parent_kind,
                field,
            } => {
                let parent = parent?;
                let parent_record = self.record_mut(parent_kind, parent)?;
                let slot =
                    parent_record.entry(field).or_insert_with(|| Value::Array(Vec::new()));
                slot.as_array_mut()
            }
        }
    }

    /// Returns every record of `kind` mutably, paired with its parent's name.
    ///
    /// Never creates keys; missing collections yield nothing.
    pub fn located_mut(&mut self, kind: ResourceKind) -> Vec<(Option<String>, &mut Record)> {
        match kind.location() {
            Location::Singleton => self
                .0
                .get_mut(kind.as_str())
                .and_then(Value::as_object_mut)
                .map(|record| (None, record))
                .into_iter()
                .collect(),
            Location::Collection => records_of_mut(self.0.get_mut(kind.as_str()))
                .into_iter()
                .map(|record| (None, record))
                .collect(),
            Location::Nested {
                parent,
                field,
            } => {
                let mut located = Vec::new();
                for parent_record in records_of_mut(self.0.get_mut(parent.as_str())) {
                    let parent_name = record_name(parent_record).map(str::to_string);
                    for record in records_of_mut(parent_record.get_mut(field)) {
                        located.push((parent_name.clone(), record));
                    }
                }
                located
            }
        }
    }

    /// Returns the first top-level record of `kind` named `name`.
    pub fn record_mut(&mut self, kind: ResourceKind, name: &str) -> Option<&mut Record> {
        self.0
            .get_mut(kind.as_str())?
            .as_array_mut()?
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|record| record_name(record) == Some(name))
    }

    /// Returns the names of the records of `kind` under `parent`.
    #[must_use]
    pub fn names(&self, kind: ResourceKind, parent: Option<&str>) -> Vec<&str> {
        self.collection(kind, parent).into_iter().filter_map(record_name).collect()
    }
}

// ============================================================================
// SECTION: Record Helpers
// ============================================================================

/// Returns the `name` field of a record.
#[must_use]
pub fn record_name(record: &Record) -> Option<&str> {
    str_field(record, "name")
}

/// Returns a string field of a record.
#[must_use]
pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Returns a string field only when it is present and non-empty.
#[must_use]
pub fn non_empty_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    str_field(record, field).filter(|value| !value.is_empty())
}

/// Returns a boolean field, treating anything else as `false`.
#[must_use]
pub fn bool_field(record: &Record, field: &str) -> bool {
    record.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// Returns the string entries of an array field.
#[must_use]
pub fn str_list<'a>(record: &'a Record, field: &str) -> Vec<&'a str> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Collects the object entries of an optional array value.
fn records_of(value: Option<&Value>) -> Vec<&Record> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Collects the object entries of an optional array value, mutably.
fn records_of_mut(value: Option<&mut Value>) -> Vec<&mut Record> {
    value
        .and_then(Value::as_array_mut)
        .map(|items| items.iter_mut().filter_map(Value::as_object_mut).collect())
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tree(value: Value) -> ConfigTree {
        match value {
            Value::Object(map) => ConfigTree::from_map(map),
            _ => ConfigTree::new(),
        }
    }

    #[test]
    fn nested_collection_filters_by_parent() {
        let tree = tree(json!({
            "vpcs": [
                {"name": "management", "subnets": [{"name": "vsi-zone-1"}]},
                {"name": "workload", "subnets": [{"name": "vpe-zone-1"}, {"name": "vsi-zone-1"}]}
            ]
        }));
        assert_eq!(tree.names(ResourceKind::Subnets, Some("workload")), vec!["vpe-zone-1", "vsi-zone-1"]);
        assert_eq!(tree.names(ResourceKind::Subnets, None).len(), 3);
        assert!(tree.names(ResourceKind::Subnets, Some("missing")).is_empty());
    }

    #[test]
    fn collection_mut_requires_existing_parent() {
        let mut tree = tree(json!({"dns": [{"name": "dev"}]}));
        assert!(tree.collection_mut(ResourceKind::DnsZones, Some("nope")).is_none());
        assert!(tree.collection_mut(ResourceKind::DnsZones, None).is_none());
        let zones = tree.collection_mut(ResourceKind::DnsZones, Some("dev"));
        assert!(zones.is_some_and(|zones| zones.is_empty()));
    }
}
