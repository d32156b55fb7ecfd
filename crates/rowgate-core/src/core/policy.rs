// crates/rowgate-core/src/core/policy.rs
// ============================================================================
// Module: Rowgate Scope Policies
// Description: Per-object row scoping policy and the derived policy set.
// Purpose: Answer which objects require tenant scoping, and on which column.
// Dependencies: serde, crate::core::{identifiers, identity}
// ============================================================================

//! ## Overview
//! A [`ScopePolicy`] records that one object carries the scoping column and
//! which roles must have it applied. The [`ScopePolicySet`] aggregates the
//! policies derived from a column catalog and answers lookups during query
//! rewriting. Object lookups fold ASCII case because catalog metadata and
//! inbound requests frequently disagree on identifier casing; the stored
//! policy keeps the catalog's spelling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::identifiers::ObjectId;
use crate::core::identity::Role;

// ============================================================================
// SECTION: Policy Types
// ============================================================================

/// Scoping requirement for a single governed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopePolicy {
    /// Object the policy governs, in the catalog's spelling.
    pub object_id: ObjectId,
    /// Column compared against the caller's tenant scope value.
    pub scoping_column: String,
    /// Roles that must have scoping applied. Roles outside this set are
    /// exempt and receive the object unscoped.
    pub requires_scope_for: BTreeSet<Role>,
}

impl ScopePolicy {
    /// Creates a policy that scopes ordinary users and exempts admins.
    #[must_use]
    pub fn new(object_id: ObjectId, scoping_column: impl Into<String>) -> Self {
        Self {
            object_id,
            scoping_column: scoping_column.into(),
            requires_scope_for: BTreeSet::from([Role::User]),
        }
    }
}

/// Set of scoping policies keyed by case-folded object identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopePolicySet {
    /// Policies keyed by the ASCII-lowercased object identifier.
    policies: BTreeMap<String, ScopePolicy>,
}

impl ScopePolicySet {
    /// Creates an empty policy set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Builds a set from explicit policies.
    #[must_use]
    pub fn from_policies(policies: impl IntoIterator<Item = ScopePolicy>) -> Self {
        let mut set = Self::new();
        for policy in policies {
            set.insert(policy);
        }
        set
    }

    /// Inserts (or replaces) a policy.
    pub fn insert(&mut self, policy: ScopePolicy) {
        self.policies.insert(policy_key(&policy.object_id), policy);
    }

    /// Returns true when `object_id` requires scoping for `role`.
    ///
    /// Objects without a policy never require scoping; callers with roles
    /// outside the policy's required set are exempt.
    #[must_use]
    pub fn is_scoping_required(&self, object_id: &ObjectId, role: Role) -> bool {
        self.policies
            .get(&policy_key(object_id))
            .is_some_and(|policy| policy.requires_scope_for.contains(&role))
    }

    /// Returns the scoping column for `object_id`, when a policy exists.
    #[must_use]
    pub fn scoping_column_for(&self, object_id: &ObjectId) -> Option<&str> {
        self.policies.get(&policy_key(object_id)).map(|policy| policy.scoping_column.as_str())
    }

    /// Returns the scoping column only when scoping applies to `role`.
    ///
    /// Combines [`Self::is_scoping_required`] and
    /// [`Self::scoping_column_for`] into the single lookup the rewriter
    /// performs per request.
    #[must_use]
    pub fn required_column(&self, object_id: &ObjectId, role: Role) -> Option<&str> {
        self.policies
            .get(&policy_key(object_id))
            .filter(|policy| policy.requires_scope_for.contains(&role))
            .map(|policy| policy.scoping_column.as_str())
    }

    /// Iterates over policies in case-folded identifier order.
    pub fn policies(&self) -> impl Iterator<Item = &ScopePolicy> {
        self.policies.values()
    }

    /// Returns the number of policies in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true when the set holds no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Case-folds an object identifier for policy lookup.
fn policy_key(object_id: &ObjectId) -> String {
    object_id.as_str().to_ascii_lowercase()
}
