// crates/rowgate-config/src/lib.rs
// ============================================================================
// Module: Rowgate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for rowgate.toml semantics.
// Dependencies: rowgate-core, serde, toml
// ============================================================================

//! ## Overview
//! `rowgate-config` defines the canonical configuration model for Rowgate. It
//! provides strict, fail-closed validation of every section and bridges the
//! validated values into the core identity rules, handler registry, and column
//! catalog. Config inputs are untrusted text and are bounded before parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod example;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use example::config_toml_example;
