// crates/rowgate-core/src/core/identity.rs
// ============================================================================
// Module: Rowgate Identity
// Description: Caller identity resolution from transport headers.
// Purpose: Derive subject, role, and scope attributes with fail-closed defaults.
// Dependencies: serde, thiserror, crate::core::{identifiers, sanitize}
// ============================================================================

//! ## Overview
//! Identity resolution turns raw transport headers into an [`Identity`] that
//! downstream components can trust. Resolution is fail-closed: a missing,
//! malformed, or out-of-range subject aborts the request unless an explicit
//! development fallback has been configured. Role assignment is allow-list
//! based; there is no way to claim an elevated role through headers alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::SubjectId;
use crate::core::sanitize::subject_in_range;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header value treated the same as an absent subject header.
pub const MISSING_SUBJECT_SENTINEL: &str = "0";
/// Default lower bound (inclusive) for acceptable subject identifiers.
pub const DEFAULT_SUBJECT_MIN: u64 = 1;
/// Default upper bound (inclusive) for acceptable subject identifiers.
pub const DEFAULT_SUBJECT_MAX: u64 = 30;
/// Default subjects granted the administrator role.
pub const DEFAULT_ADMIN_SUBJECTS: [u64; 2] = [3, 11];
/// Scope key carrying the tenant value used for row-level filtering.
pub const SCOPE_KEY_TENANT: &str = "tenant";
/// Scope key carrying the secondary correlation value, when present.
pub const SCOPE_KEY_CORRELATION: &str = "correlation";

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Coarse caller role derived from the subject allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary tenant-scoped caller.
    User,
    /// Administrator exempt from tenant scoping.
    Admin,
}

impl Role {
    /// Returns the stable lowercase label for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

// ============================================================================
// SECTION: Request Headers
// ============================================================================

/// Raw identity-bearing headers as received from the transport.
///
/// Header values are untrusted text. Absent and present-but-empty headers are
/// treated identically during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Primary subject header value, when the transport supplied one.
    pub subject: Option<String>,
    /// Secondary correlation header value, when the transport supplied one.
    pub correlation: Option<String>,
}

impl RequestHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subject: None,
            correlation: None,
        }
    }

    /// Sets the subject header value.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the correlation header value.
    #[must_use]
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Returns true when the subject header is absent, blank, or carries the
    /// "no identity" sentinel.
    #[must_use]
    pub fn subject_is_missing(&self) -> bool {
        let subject = self.subject.as_deref().map(str::trim).unwrap_or_default();
        subject.is_empty() || subject == MISSING_SUBJECT_SENTINEL
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Resolved caller identity.
///
/// Immutable once produced by the resolver. The `scope` map carries the
/// attribute values used for row-level filtering; see [`SCOPE_KEY_TENANT`]
/// and [`SCOPE_KEY_CORRELATION`] for the well-known keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Validated subject identifier.
    pub subject_id: SubjectId,
    /// Role assigned from the administrator allow-list.
    pub role: Role,
    /// Scope attributes available for query rewriting.
    pub scope: BTreeMap<String, String>,
}

impl Identity {
    /// Returns the tenant scope value, when present.
    #[must_use]
    pub fn tenant_scope(&self) -> Option<&str> {
        self.scope.get(SCOPE_KEY_TENANT).map(String::as_str)
    }

    /// Returns the secondary correlation value, when present.
    #[must_use]
    pub fn correlation(&self) -> Option<&str> {
        self.scope.get(SCOPE_KEY_CORRELATION).map(String::as_str)
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Resolution rules for subject validation and role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRules {
    /// Lower bound (inclusive) for acceptable subject identifiers.
    pub subject_min: u64,
    /// Upper bound (inclusive) for acceptable subject identifiers.
    pub subject_max: u64,
    /// Subjects granted the administrator role.
    pub admin_subjects: BTreeSet<u64>,
    /// Development-only fallback subject used when the subject header is
    /// missing. `None` keeps resolution fail-closed.
    pub dev_fallback: Option<SubjectId>,
}

impl Default for IdentityRules {
    fn default() -> Self {
        Self {
            subject_min: DEFAULT_SUBJECT_MIN,
            subject_max: DEFAULT_SUBJECT_MAX,
            admin_subjects: BTreeSet::from(DEFAULT_ADMIN_SUBJECTS),
            dev_fallback: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced during identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Subject header is missing, malformed, or outside the permitted range.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves transport headers into a trusted [`Identity`].
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    /// Rules applied during resolution.
    rules: IdentityRules,
}

impl IdentityResolver {
    /// Creates a resolver with the supplied rules.
    #[must_use]
    pub const fn new(rules: IdentityRules) -> Self {
        Self {
            rules,
        }
    }

    /// Returns the rules this resolver applies.
    #[must_use]
    pub const fn rules(&self) -> &IdentityRules {
        &self.rules
    }

    /// Resolves raw headers into an [`Identity`].
    ///
    /// A missing or sentinel subject aborts resolution unless a development
    /// fallback subject is configured, in which case the fallback identity is
    /// returned and the caller is expected to surface the substitution in its
    /// audit stream.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidIdentity`] when the subject header is
    /// absent with no fallback configured, is not numeric, or falls outside
    /// the permitted range.
    pub fn resolve(&self, headers: &RequestHeaders) -> Result<Identity, IdentityError> {
        if headers.subject_is_missing() {
            let Some(fallback) = self.rules.dev_fallback else {
                return Err(IdentityError::InvalidIdentity(
                    "subject header is missing".to_string(),
                ));
            };
            return Ok(self.identity_for(fallback, headers));
        }
        let subject = headers.subject.as_deref().map(str::trim).unwrap_or_default();
        let value = subject_in_range(subject, self.rules.subject_min, self.rules.subject_max)
            .map_err(|err| IdentityError::InvalidIdentity(err.to_string()))?;
        let subject_id = SubjectId::from_raw(value)
            .ok_or_else(|| IdentityError::InvalidIdentity("subject must be non-zero".to_string()))?;
        Ok(self.identity_for(subject_id, headers))
    }

    /// Builds the identity for a validated subject, attaching scope values.
    fn identity_for(&self, subject_id: SubjectId, headers: &RequestHeaders) -> Identity {
        let role = if self.rules.admin_subjects.contains(&subject_id.get()) {
            Role::Admin
        } else {
            Role::User
        };
        let mut scope = BTreeMap::new();
        scope.insert(SCOPE_KEY_TENANT.to_string(), subject_id.to_string());
        if let Some(correlation) = headers.correlation.as_deref().map(str::trim)
            && !correlation.is_empty()
        {
            scope.insert(SCOPE_KEY_CORRELATION.to_string(), correlation.to_string());
        }
        Identity {
            subject_id,
            role,
            scope,
        }
    }
}
