// crates/iac-forge-core/src/schema/mod.rs
// ============================================================================
// Module: Schema Registry
// Description: Declarative per-resource-type definitions consumed by the store.
// Purpose: Keep defaults, field rules, references, and save gating as data.
// Dependencies: iac-forge-validate, serde_json, thiserror, crate::{context, kind, tree}
// ============================================================================

//! ## Overview
//! Each [`ResourceKind`] maps to exactly one static [`ResourceSchema`]. The
//! store never holds type-specific rules; it reads defaults, hooks, and the
//! reference table from here, and callers ask the registry whether a record
//! may be saved.
//!
//! The mapping is a `match` over the closed kind enumeration, so a kind
//! without a schema is a compile error. [`verify_registry`] checks the
//! cross-table consistency that the type system cannot (parent links, scope
//! shapes, duplicate fields) and runs once when a store is constructed.
//!
//! # Invariants
//! - `schema_for(kind).kind == kind` for every kind.
//! - Reference scopes only name nested targets when the scope can identify a
//!   parent record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use iac_forge_validate::has_duplicate_name;
use iac_forge_validate::invalid_dns_zone_name_format;
use iac_forge_validate::invalid_name_format;
use iac_forge_validate::invalid_name_text;
use iac_forge_validate::invalid_number;
use iac_forge_validate::invalid_number_text;
use iac_forge_validate::is_null_or_empty;
use serde_json::Value;
use thiserror::Error;

use crate::context::OpContext;
use crate::context::Range;
use crate::kind::KindError;
use crate::kind::Location;
use crate::kind::ResourceKind;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::str_field;

// ============================================================================
// SECTION: Modules
// ============================================================================

mod dns;
mod iam;
mod network;
mod options;
mod services;

pub use dns::RECORD_TYPES;
pub use iam::OPERATORS;
pub use iam::operator_display;
pub use iam::operator_stored;
pub use network::CLASSIC_DATACENTERS;
pub use network::FLOW_LOGS_DISABLED;
pub use options::POWER_VS_REGIONS;
pub use options::power_ha_pair;
pub use services::EVENT_STREAMS_STORAGE;
pub use services::EVENT_STREAMS_THROUGHPUT;
pub use services::ICD_SERVICES;

// ============================================================================
// SECTION: Function Types
// ============================================================================

/// Record predicate evaluated against the tree.
pub type Predicate = fn(&Record, &SchemaContext<'_>) -> bool;
/// Helper or invalid text builder.
pub type TextFn = fn(&Record, &SchemaContext<'_>) -> String;
/// Computes the legal values of a field.
pub type GroupsFn = fn(&Record, &SchemaContext<'_>) -> Vec<String>;
/// Hides a field based on the record being edited.
pub type HideFn = fn(&Record) -> bool;
/// Rewrites the record when a field's raw input changes.
pub type StateChangeFn = fn(&mut Record);
/// Produces the display value of a field.
pub type RenderFn = fn(&Record) -> String;
/// Writes the default sub-tree of a top-level kind.
pub type InitFn = fn(&mut ConfigTree);
/// Adjusts a freshly merged record before it is appended.
pub type CreateHook = fn(&mut Record);
/// Adjusts a merged record (and possibly the tree) before it is written back.
///
/// Arguments are the tree, the stored record, and the merged record.
pub type SaveHook = fn(&mut ConfigTree, &Record, &mut Record);

// ============================================================================
// SECTION: Schema Types
// ============================================================================

/// Evaluation context for schema predicates.
#[derive(Debug, Clone, Copy)]
pub struct SchemaContext<'a> {
    /// Kind of the record under evaluation.
    pub kind: ResourceKind,
    /// Tree the record belongs to (or will belong to).
    pub tree: &'a ConfigTree,
    /// Operation context identifying the edited record.
    pub op: &'a OpContext,
}

/// Constant default value for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Str(&'static str),
    /// List of strings (possibly empty).
    StrList(&'static [&'static str]),
}

impl DefaultValue {
    /// Converts the default into a JSON value.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(value),
            Self::Int(value) => Value::from(value),
            Self::Str(value) => Value::from(value),
            Self::StrList(values) => Value::Array(values.iter().map(|value| Value::from(*value)).collect()),
        }
    }
}

/// Metadata for one field of a resource type.
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    /// Field name.
    pub name: &'static str,
    /// Form default.
    pub default: Option<DefaultValue>,
    /// True when the field may be left empty.
    pub optional: bool,
    /// Validity predicate; true means invalid.
    pub invalid: Option<Predicate>,
    /// Text shown when the field is invalid.
    pub invalid_text: Option<TextFn>,
    /// Text shown under the field while editing.
    pub helper_text: Option<TextFn>,
    /// Visibility predicate; true means hidden.
    pub hide_when: Option<HideFn>,
    /// Legal values, possibly computed from other fields.
    pub groups: Option<GroupsFn>,
    /// Transform applied when the field's raw input changes.
    pub on_state_change: Option<StateChangeFn>,
    /// Inverse transform for display.
    pub on_render: Option<RenderFn>,
}

impl FieldSchema {
    /// Field with no rules.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            optional: false,
            invalid: None,
            invalid_text: None,
            helper_text: None,
            hide_when: None,
            groups: None,
            on_state_change: None,
            on_render: None,
        }
    }

    /// Evaluates the validity predicate; fields without one are valid.
    #[must_use]
    pub fn is_invalid(&self, record: &Record, ctx: &SchemaContext<'_>) -> bool {
        self.invalid.is_some_and(|invalid| invalid(record, ctx))
    }

    /// Evaluates the visibility predicate; fields without one are shown.
    #[must_use]
    pub fn is_hidden(&self, record: &Record) -> bool {
        self.hide_when.is_some_and(|hide| hide(record))
    }

    /// Returns the legal values of the field (empty when unrestricted).
    #[must_use]
    pub fn groups(&self, record: &Record, ctx: &SchemaContext<'_>) -> Vec<String> {
        self.groups.map(|groups| groups(record, ctx)).unwrap_or_default()
    }

    /// Returns the invalid text for the field.
    #[must_use]
    pub fn invalid_text(&self, record: &Record, ctx: &SchemaContext<'_>) -> String {
        self.invalid_text.map_or_else(|| format!("Invalid {}", self.name), |text| text(record, ctx))
    }

    /// Returns the helper text for the field, if any.
    #[must_use]
    pub fn helper_text(&self, record: &Record, ctx: &SchemaContext<'_>) -> Option<String> {
        self.helper_text.map(|text| text(record, ctx))
    }

    /// Applies the state-change transform, if any.
    pub fn state_change(&self, record: &mut Record) {
        if let Some(change) = self.on_state_change {
            change(record);
        }
    }

    /// Returns the display value of the field.
    #[must_use]
    pub fn render(&self, record: &Record) -> String {
        match self.on_render {
            Some(render) => render(record),
            None => str_field(record, self.name).unwrap_or_default().to_string(),
        }
    }
}

/// Location of a name-valued reference inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    /// Top-level field of the record.
    Field(&'static str),
    /// Field of an object stored in `object`.
    Nested {
        /// Object-valued field.
        object: &'static str,
        /// Field inside the object.
        field: &'static str,
    },
    /// Field of every object in the array stored in `array`.
    ///
    /// Elements whose reference dangles are dropped from the array.
    Each {
        /// Array-valued field.
        array: &'static str,
        /// Field inside each element.
        field: &'static str,
    },
}

impl FieldPath {
    /// Returns the top-level field the path starts from.
    #[must_use]
    pub const fn root(self) -> &'static str {
        match self {
            Self::Field(field) => field,
            Self::Nested {
                object, ..
            } => object,
            Self::Each {
                array, ..
            } => array,
        }
    }
}

/// Number of names a reference holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// A single name; dangling values become null.
    One,
    /// A list of names; dangling entries are filtered out.
    Many,
}

/// Which records a reference may resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any record of the target kind.
    Global,
    /// Target records sharing the referencing record's parent.
    Sibling,
    /// Target records under the parent named by a field of this record.
    Field(&'static str),
    /// Target records under the parent named by a field of this record's parent.
    ParentField(&'static str),
}

/// Declares that a field of one kind names a record of another kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Where the name lives.
    pub path: FieldPath,
    /// Kind of the named record.
    pub target: ResourceKind,
    /// One name or a list.
    pub arity: Arity,
    /// Resolution scope.
    pub scope: Scope,
    /// Sentinel value that is never treated as dangling.
    pub keep: Option<&'static str>,
}

impl Reference {
    /// Single-name reference resolved against every record of `target`.
    #[must_use]
    pub const fn one(field: &'static str, target: ResourceKind) -> Self {
        Self {
            path: FieldPath::Field(field),
            target,
            arity: Arity::One,
            scope: Scope::Global,
            keep: None,
        }
    }

    /// List-of-names reference resolved against every record of `target`.
    #[must_use]
    pub const fn many(field: &'static str, target: ResourceKind) -> Self {
        Self {
            path: FieldPath::Field(field),
            target,
            arity: Arity::Many,
            scope: Scope::Global,
            keep: None,
        }
    }

    /// Replaces the scope.
    #[must_use]
    pub const fn scoped(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Declarative definition of a resource type.
#[derive(Debug)]
pub struct ResourceSchema {
    /// Kind this schema defines.
    pub kind: ResourceKind,
    /// Field on child records naming their parent record.
    pub parent_link: Option<&'static str>,
    /// Values merged under new records at create time.
    pub defaults: &'static [(&'static str, DefaultValue)],
    /// Default sub-tree writer for top-level kinds.
    pub init: Option<InitFn>,
    /// Side effects applied at create time.
    pub on_create: Option<CreateHook>,
    /// Side effects applied at save time.
    pub on_save: Option<SaveHook>,
    /// Name-valued references to other records.
    pub references: &'static [Reference],
    /// Field metadata.
    pub fields: &'static [FieldSchema],
    /// Save gating predicate; true blocks persistence.
    pub disable_save: Predicate,
}

impl ResourceSchema {
    /// Returns the metadata for a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Builds the default record merged under new records.
    #[must_use]
    pub fn default_record(&self) -> Record {
        self.defaults.iter().map(|(field, value)| ((*field).to_string(), value.to_value())).collect()
    }
}

/// Errors raised when the registry is internally inconsistent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Registry entry violates a structural rule.
    #[error("invalid schema for {kind}: {reason}")]
    Invalid {
        /// Offending kind.
        kind: ResourceKind,
        /// Violated rule.
        reason: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Returns the schema for a kind.
#[must_use]
pub fn schema_for(kind: ResourceKind) -> &'static ResourceSchema {
    match kind {
        ResourceKind::Options => &options::OPTIONS,
        ResourceKind::IamAccountSettings => &options::IAM_ACCOUNT_SETTINGS,
        ResourceKind::Atracker => &options::ATRACKER,
        ResourceKind::ResourceGroups => &services::RESOURCE_GROUPS,
        ResourceKind::KeyManagement => &services::KEY_MANAGEMENT,
        ResourceKind::EncryptionKeys => &services::ENCRYPTION_KEYS,
        ResourceKind::ObjectStorage => &services::OBJECT_STORAGE,
        ResourceKind::Buckets => &services::BUCKETS,
        ResourceKind::CosKeys => &services::COS_KEYS,
        ResourceKind::SecretsManager => &services::SECRETS_MANAGER,
        ResourceKind::Icd => &services::ICD,
        ResourceKind::EventStreams => &services::EVENT_STREAMS,
        ResourceKind::Appid => &services::APPID,
        ResourceKind::AppidKeys => &services::APPID_KEYS,
        ResourceKind::Vpcs => &network::VPCS,
        ResourceKind::Subnets => &network::SUBNETS,
        ResourceKind::SecurityGroups => &network::SECURITY_GROUPS,
        ResourceKind::SgRules => &network::SG_RULES,
        ResourceKind::SshKeys => &network::SSH_KEYS,
        ResourceKind::TransitGateways => &network::TRANSIT_GATEWAYS,
        ResourceKind::ClassicSshKeys => &network::CLASSIC_SSH_KEYS,
        ResourceKind::ClassicVlans => &network::CLASSIC_VLANS,
        ResourceKind::Dns => &dns::DNS,
        ResourceKind::DnsZones => &dns::ZONES,
        ResourceKind::DnsRecords => &dns::RECORDS,
        ResourceKind::DnsCustomResolvers => &dns::CUSTOM_RESOLVERS,
        ResourceKind::AccessGroups => &iam::ACCESS_GROUPS,
        ResourceKind::AccessPolicies => &iam::POLICIES,
        ResourceKind::DynamicPolicies => &iam::DYNAMIC_POLICIES,
    }
}

/// Returns the metadata for a field of a kind.
#[must_use]
pub fn field(kind: ResourceKind, name: &str) -> Option<&'static FieldSchema> {
    schema_for(kind).field(name)
}

/// Returns every `(referencing kind, reference)` pair that targets `target`.
#[must_use]
pub fn references_to(target: ResourceKind) -> Vec<(ResourceKind, &'static Reference)> {
    ResourceKind::ALL
        .into_iter()
        .flat_map(|kind| {
            schema_for(kind)
                .references
                .iter()
                .filter(move |reference| reference.target == target)
                .map(move |reference| (kind, reference))
        })
        .collect()
}

/// Answers whether a record of `kind` must not be persisted as edited.
#[must_use]
pub fn should_disable_save(
    kind: ResourceKind,
    record: &Record,
    tree: &ConfigTree,
    op: &OpContext,
) -> bool {
    let ctx = SchemaContext {
        kind,
        tree,
        op,
    };
    (schema_for(kind).disable_save)(record, &ctx)
}

/// Save gating addressed by resource-type tag.
///
/// # Errors
///
/// Returns [`KindError`] when the tag names no known resource type.
pub fn should_disable_save_by_tag(
    tag: &str,
    record: &Record,
    tree: &ConfigTree,
    op: &OpContext,
) -> Result<bool, KindError> {
    let kind = tag.parse::<ResourceKind>()?;
    Ok(should_disable_save(kind, record, tree, op))
}

/// Checks cross-table consistency of the registry.
///
/// # Errors
///
/// Returns [`SchemaError`] describing the first inconsistency found.
pub fn verify_registry() -> Result<(), SchemaError> {
    for kind in ResourceKind::ALL {
        verify_schema(kind, schema_for(kind))?;
    }
    Ok(())
}

/// Checks one schema entry.
fn verify_schema(kind: ResourceKind, schema: &ResourceSchema) -> Result<(), SchemaError> {
    let fail = |reason: String| SchemaError::Invalid {
        kind,
        reason,
    };
    if schema.kind != kind {
        return Err(fail(format!("registered under {} but declares {}", kind, schema.kind)));
    }
    let mut seen = BTreeSet::new();
    for field in schema.fields {
        if !seen.insert(field.name) {
            return Err(fail(format!("duplicate field {}", field.name)));
        }
    }
    match kind.location() {
        Location::Singleton if schema.init.is_none() => {
            return Err(fail("singleton kinds require an init function".to_string()));
        }
        Location::Nested {
            ..
        } if schema.init.is_some() => {
            return Err(fail("nested kinds are initialized by their parent".to_string()));
        }
        Location::Singleton | Location::Collection if schema.parent_link.is_some() => {
            return Err(fail("only nested kinds carry a parent link".to_string()));
        }
        _ => {}
    }
    if let Some(parent) = kind.parent()
        && parent.location() != Location::Collection
    {
        return Err(fail(format!("parent {parent} is not a top-level collection")));
    }
    for reference in schema.references {
        let root = reference.path.root();
        if schema.field(root).is_none() {
            return Err(fail(format!("reference field {root} is not declared")));
        }
        verify_reference(kind, reference).map_err(fail)?;
    }
    Ok(())
}

/// Checks that a reference's scope can be resolved.
fn verify_reference(kind: ResourceKind, reference: &Reference) -> Result<(), String> {
    let target_parent = reference.target.parent();
    match reference.scope {
        Scope::Global => Ok(()),
        Scope::Sibling if target_parent.is_some() && target_parent == kind.parent() => Ok(()),
        Scope::Sibling => {
            Err(format!("sibling reference to {} from a different parent", reference.target))
        }
        Scope::Field(_) if target_parent.is_some() => Ok(()),
        Scope::ParentField(_) if target_parent.is_some() && kind.parent().is_some() => Ok(()),
        Scope::Field(_) | Scope::ParentField(_) => {
            Err(format!("scoped reference to {} cannot identify a parent", reference.target))
        }
    }
}

// ============================================================================
// SECTION: Shared Predicates
// ============================================================================

/// Fallback limits used when the context provides none.
pub(crate) const fn range(min: i64, max: i64) -> Range {
    Range {
        min,
        max,
    }
}

/// True when the record's name fails its format rule or duplicates a sibling.
#[must_use]
pub fn invalid_name(record: &Record, ctx: &SchemaContext<'_>) -> bool {
    let name = str_field(record, "name").unwrap_or_default();
    let bad_format = if ctx.kind == ResourceKind::DnsZones {
        invalid_dns_zone_name_format(name)
    } else {
        invalid_name_format(name)
    };
    bad_format || duplicate_name(name, ctx)
}

/// True when `name` collides with a sibling other than the edited record.
fn duplicate_name(name: &str, ctx: &SchemaContext<'_>) -> bool {
    has_duplicate_name(ctx.tree.names(ctx.kind, ctx.op.parent()), name, ctx.op.name())
}

/// Invalid text for the `name` field.
#[must_use]
pub fn name_text(record: &Record, ctx: &SchemaContext<'_>) -> String {
    let name = str_field(record, "name").unwrap_or_default();
    invalid_name_text(name, duplicate_name(name, ctx))
}

/// True when the field is missing, null, or the empty string.
pub(crate) fn missing(record: &Record, field: &str) -> bool {
    is_null_or_empty(record.get(field))
}

/// True when any of the fields is missing, null, empty, or an empty list.
pub(crate) fn any_missing(record: &Record, fields: &[&str]) -> bool {
    fields.iter().any(|field| {
        missing(record, field) || record.get(*field).and_then(Value::as_array).is_some_and(Vec::is_empty)
    })
}

/// True when a non-empty field is not a whole number within `range`.
pub(crate) fn invalid_in_range(record: &Record, field: &str, range: Range) -> bool {
    invalid_number(record.get(field), range.min, range.max)
}

/// Invalid text for a numeric field with fixed limits.
pub(crate) fn number_text(range: Range) -> String {
    invalid_number_text(range.min, range.max)
}

/// The `name` field shared by every named kind.
pub(crate) const NAME_FIELD: FieldSchema = FieldSchema {
    invalid: Some(invalid_name),
    invalid_text: Some(name_text),
    ..FieldSchema::new("name")
};

/// True when any of the named fields is invalid.
pub(crate) fn fields_invalid(record: &Record, ctx: &SchemaContext<'_>, names: &[&str]) -> bool {
    let schema = schema_for(ctx.kind);
    names.iter().filter_map(|name| schema.field(name)).any(|field| field.is_invalid(record, ctx))
}

/// Helper text showing the prefixed resource name.
pub(crate) fn prefixed_name(record: &Record, ctx: &SchemaContext<'_>) -> String {
    let prefix = ctx
        .tree
        .singleton(ResourceKind::Options)
        .and_then(|options| str_field(options, "prefix"))
        .unwrap_or_default();
    format!("{}-{}", prefix, str_field(record, "name").unwrap_or_default())
}

/// Unwraps a JSON object literal into a record.
pub(crate) fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
