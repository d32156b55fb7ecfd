// crates/rowgate-core/src/core/query.rs
// ============================================================================
// Module: Rowgate Query Types
// Description: Validated/unvalidated query distinction and verdict reporting.
// Purpose: Make unvalidated SQL text unrepresentable at execution boundaries.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Query text moves through the access layer in two states. An
//! [`UnvalidatedQuery`] wraps arbitrary text and can be built by anyone; a
//! [`ValidatedQuery`] can only be produced by the safety validator, so any API
//! that demands one is guaranteed text that parsed as a single read-only
//! select. The distinction is enforced by the type system rather than by
//! convention: [`ValidatedQuery`] has no public constructor and no
//! deserialization path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Query States
// ============================================================================

/// SQL text that has not yet passed safety validation.
///
/// Treat the contents as untrusted regardless of where they came from;
/// synthesized text and caller-supplied text ride through the same gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnvalidatedQuery {
    /// Raw query text awaiting validation.
    text: String,
}

impl UnvalidatedQuery {
    /// Wraps raw query text for validation.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
        }
    }

    /// Returns the raw text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the wrapper and returns the raw text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl From<&str> for UnvalidatedQuery {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UnvalidatedQuery {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// SQL text that passed safety validation.
///
/// Only the safety validator can construct this type, so holding one is proof
/// that the text parsed as exactly one read-only select. There is
/// intentionally no `Deserialize` implementation: validated text cannot be
/// smuggled in from outside the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedQuery {
    /// Query text proven safe by the validator.
    text: String,
}

impl ValidatedQuery {
    /// Marks text as validated. Restricted to the validator.
    #[must_use]
    pub(crate) const fn approve(text: String) -> Self {
        Self {
            text,
        }
    }

    /// Returns the validated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the wrapper and returns the validated text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Outcome of a safety validation check, suitable for reporting surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether the text was accepted as a single read-only select.
    pub accepted: bool,
    /// Rejection reason, present exactly when `accepted` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    /// Builds an accepting verdict.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    /// Builds a rejecting verdict with a reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}
