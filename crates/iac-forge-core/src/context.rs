// crates/iac-forge-core/src/context.rs
// ============================================================================
// Module: Operation Context
// Description: Identifies the record an operation targets and carries form limits.
// Purpose: Replace ad hoc component props with an explicit, typed context.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every store operation and save-gating query takes an [`OpContext`]. It
//! names the record being edited (its stored name, before any rename), the
//! parent record for nested collections, and optional numeric limits that a
//! caller may supply for range-checked fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Inclusive numeric bounds for a range-checked field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
}

/// Context for a create, save, delete, or save-gating call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpContext {
    /// Stored name of the record being edited; `None` for new records.
    pub name: Option<String>,
    /// Name of the parent record for nested collections.
    pub parent: Option<String>,
    /// Caller-supplied limits keyed by field name.
    pub ranges: BTreeMap<String, Range>,
}

impl OpContext {
    /// Creates an empty context (a new top-level record).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context targeting an existing record by its stored name.
    #[must_use]
    pub fn editing(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the parent record name.
    #[must_use]
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds an inclusive limit for a numeric field.
    #[must_use]
    pub fn with_range(mut self, field: &str, min: i64, max: i64) -> Self {
        self.ranges.insert(
            field.to_string(),
            Range {
                min,
                max,
            },
        );
        self
    }

    /// Returns the caller limit for `field`, falling back to `default`.
    #[must_use]
    pub fn range_or(&self, field: &str, default: Range) -> Range {
        self.ranges.get(field).copied().unwrap_or(default)
    }

    /// Returns the stored name of the record being edited.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the parent record name.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}
