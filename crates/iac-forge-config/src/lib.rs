// crates/iac-forge-config/src/lib.rs
// ============================================================================
// Module: Tool Config Library
// Description: Configuration model and loader for iac-forge.toml.
// Purpose: Single source of truth for tool configuration semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `iac-forge-config` defines the settings the `iac-forge` binary reads at
//! startup: logging, default generator paths, and input limits. Loading is
//! strict and fails closed; only an absent default file falls back to
//! defaults.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
