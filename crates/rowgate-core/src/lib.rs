// crates/rowgate-core/src/lib.rs
// ============================================================================
// Module: Rowgate Core Library
// Description: Public API surface for the Rowgate core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Rowgate core provides fail-closed, row-level access control for multi-tenant
//! data sources. It resolves caller identity from transport headers, decides
//! which objects require tenant scoping, rewrites object requests into scoped
//! queries or bound procedure calls, and refuses to release any synthesized
//! query text that is not a single read-only select. The crate is
//! backend-agnostic and integrates through explicit interfaces rather than
//! embedding into any particular server framework.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::IdentityAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::RewriteAuditEvent;
pub use audit::SecurityAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::ValidationAuditEvent;
pub use interfaces::CatalogError;
pub use interfaces::ColumnCatalog;
pub use interfaces::ColumnRef;
pub use interfaces::StaticColumnCatalog;
pub use runtime::DEFAULT_CORRELATION_WIDTH;
pub use runtime::MAX_QUERY_BYTES;
pub use runtime::QueryRewriter;
pub use runtime::RewriteError;
pub use runtime::RewriteOutcome;
pub use runtime::SafetyValidator;
pub use runtime::ValidationError;
