// crates/rowgate-core/src/runtime/mod.rs
// ============================================================================
// Module: Rowgate Runtime
// Description: Query rewriting engine and SQL safety validation.
// Purpose: Turn data requests into scoped, validated execution plans.
// Dependencies: crate::{core, interfaces}, sqlparser
// ============================================================================

//! ## Overview
//! Runtime modules implement the per-request pipeline: the rewriter decides
//! how a request reaches the database (pass-through, bound procedure, or
//! synthesized scoped select), and the validator proves that any synthesized
//! or inbound SQL text is a single read-only select before it may be
//! released. Every execution surface must flow through this pipeline to
//! preserve the scoping guarantees.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod rewriter;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use rewriter::DEFAULT_CORRELATION_WIDTH;
pub use rewriter::QueryRewriter;
pub use rewriter::RewriteError;
pub use rewriter::RewriteOutcome;
pub use validator::MAX_QUERY_BYTES;
pub use validator::SafetyValidator;
pub use validator::ValidationError;
