// crates/iac-forge-core/src/lib.rs
// ============================================================================
// Module: Core Library Root
// Description: Configuration tree, schema registry, and store for iac-forge.
// Purpose: Expose the data model and the single-writer store.
// Dependencies: crate::{context, fixup, kind, reference, schema, store, tree}
// ============================================================================

//! ## Overview
//! The core crate owns the deployment description. [`ConfigTree`] is the raw
//! JSON tree, [`ResourceKind`] names every collection in it, the [`schema`]
//! registry declares per-kind defaults, field rules and references, and
//! [`ConfigStore`] applies create, save, and delete while keeping names unique
//! and references consistent.
//!
//! Code generation reads a [`ConfigTree`] snapshot and never mutates it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod fixup;
pub mod kind;
pub mod reference;
pub mod schema;
pub mod store;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::OpContext;
pub use context::Range;
pub use kind::KindError;
pub use kind::Location;
pub use kind::ResourceKind;
pub use reference::find;
pub use reference::find_by_name;
pub use reference::record_exists;
pub use reference::uses_data;
pub use schema::SchemaError;
pub use schema::schema_for;
pub use schema::should_disable_save;
pub use schema::should_disable_save_by_tag;
pub use store::ConfigStore;
pub use store::StoreError;
pub use store::UpdateCallback;
pub use store::default_tree;
pub use tree::ConfigTree;
pub use tree::Record;
pub use tree::bool_field;
pub use tree::non_empty_str;
pub use tree::record_name;
pub use tree::str_field;
pub use tree::str_list;
