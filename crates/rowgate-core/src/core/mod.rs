// crates/rowgate-core/src/core/mod.rs
// ============================================================================
// Module: Rowgate Core Types
// Description: Canonical identity, request, policy, and query structures.
// Purpose: Provide stable, serializable types for the data access layer.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types define caller identity, inbound data requests, per-object scope
//! policies, and the validated/unvalidated query distinction. These types are
//! the canonical source of truth for any derived surfaces (CLI, HTTP, or
//! embedding hosts).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod identity;
pub mod policy;
pub mod query;
pub mod request;
pub mod sanitize;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ObjectId;
pub use identifiers::SubjectId;
pub use identity::DEFAULT_ADMIN_SUBJECTS;
pub use identity::DEFAULT_SUBJECT_MAX;
pub use identity::DEFAULT_SUBJECT_MIN;
pub use identity::Identity;
pub use identity::IdentityError;
pub use identity::IdentityResolver;
pub use identity::IdentityRules;
pub use identity::MISSING_SUBJECT_SENTINEL;
pub use identity::RequestHeaders;
pub use identity::Role;
pub use identity::SCOPE_KEY_CORRELATION;
pub use identity::SCOPE_KEY_TENANT;
pub use policy::ScopePolicy;
pub use policy::ScopePolicySet;
pub use query::UnvalidatedQuery;
pub use query::ValidatedQuery;
pub use query::ValidationVerdict;
pub use request::DataRequest;
pub use request::HandlerRegistry;
pub use request::ObjectHandler;
pub use request::RequestKind;
pub use sanitize::SanitizeError;
pub use sanitize::escape_single_quotes;
pub use sanitize::fixed_width_token;
pub use sanitize::subject_in_range;
