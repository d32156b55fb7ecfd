// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for Rowgate system-tests.
// Purpose: Assemble the access-control pipeline from configuration.
// Dependencies: rowgate-config, rowgate-core
// ============================================================================

//! ## Overview
//! Shared helpers for Rowgate system-tests.
//! Purpose: Assemble the identity-resolution and query-rewriting pipeline
//! from configuration the way an embedding application would.
//! Invariants:
//! - System-test execution is deterministic and fail-closed.
//! - Inputs are treated as untrusted unless explicitly built by a suite.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod gate;
