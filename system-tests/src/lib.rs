// system-tests/src/lib.rs
// ============================================================================
// Module: Rowgate System Tests Library
// Description: Anchor crate for the end-to-end Rowgate test suites.
// Purpose: Host the feature gate that keeps system suites out of default runs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate anchors the Rowgate system-test suites in `system-tests/tests`.
//! The suites build the full identity-resolution and query-rewriting pipeline
//! from configuration and exercise it in-process; they are gated behind the
//! `system-tests` feature so default builds stay fast.
//! Security posture: system-test inputs are untrusted unless explicitly built
//! by a suite.
