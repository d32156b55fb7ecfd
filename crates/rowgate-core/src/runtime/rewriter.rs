// crates/rowgate-core/src/runtime/rewriter.rs
// ============================================================================
// Module: Rowgate Query Rewriter
// Description: Request-to-plan rewriting with mandatory tenant scoping.
// Purpose: Decide how each data request may reach the database.
// Dependencies: thiserror, crate::core, crate::runtime::validator
// ============================================================================

//! ## Overview
//! The rewriter turns a [`DataRequest`] plus a resolved [`Identity`] into a
//! [`RewriteOutcome`]: an unchanged pass-through, a procedure call with the
//! tenant scope bound as a parameter, or a synthesized select filtered on the
//! scoping column. Dispatch is registry-driven: objects with a registered
//! handler use it, and everything else falls through to the generic scoping
//! policy. Every synthesized select passes through the safety validator
//! before it leaves this module, so an outcome can never carry unvalidated
//! text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ObjectId;
use crate::core::identity::Identity;
use crate::core::policy::ScopePolicySet;
use crate::core::query::ValidatedQuery;
use crate::core::request::DataRequest;
use crate::core::request::HandlerRegistry;
use crate::core::request::ObjectHandler;
use crate::core::request::RequestKind;
use crate::core::sanitize::escape_single_quotes;
use crate::core::sanitize::fixed_width_token;
use crate::runtime::validator::SafetyValidator;
use crate::runtime::validator::ValidationError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default required width, in digits, of the secondary correlation token.
pub const DEFAULT_CORRELATION_WIDTH: usize = 2;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// How a data request reaches the database after rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RewriteOutcome {
    /// Request proceeds unchanged; no scoping was required.
    PassThrough,
    /// Request becomes a procedure call with the tenant scope bound.
    BoundProcedure {
        /// Procedure to invoke.
        procedure: ObjectId,
        /// Full parameter map, including the bound scope value.
        parameters: BTreeMap<String, String>,
    },
    /// Request becomes a synthesized, validated, scoped select.
    ScopedQuery {
        /// Validated query text ready for execution.
        query: ValidatedQuery,
    },
}

impl RewriteOutcome {
    /// Returns the stable lowercase label for this outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::BoundProcedure {
                ..
            } => "bound_procedure",
            Self::ScopedQuery {
                ..
            } => "scoped_query",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort query rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Identity carries no usable scope value for a scoped object.
    #[error("missing scope: {0}")]
    MissingScope(String),
    /// A caller-supplied secondary value is absent or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Synthesized query text failed safety validation.
    #[error("query rejected: {0}")]
    QueryRejected(#[from] ValidationError),
}

// ============================================================================
// SECTION: Rewriter
// ============================================================================

/// Registry-driven rewriter enforcing tenant scoping on every request.
#[derive(Debug, Clone)]
pub struct QueryRewriter {
    /// Scoping policies derived from the column catalog.
    policies: ScopePolicySet,
    /// Handlers for objects with dedicated strategies.
    handlers: HandlerRegistry,
    /// Validator applied to every synthesized select.
    validator: SafetyValidator,
    /// Required width of the secondary correlation token.
    correlation_width: usize,
}

impl QueryRewriter {
    /// Creates a rewriter over the supplied policies and handlers.
    #[must_use]
    pub const fn new(policies: ScopePolicySet, handlers: HandlerRegistry) -> Self {
        Self {
            policies,
            handlers,
            validator: SafetyValidator::new(),
            correlation_width: DEFAULT_CORRELATION_WIDTH,
        }
    }

    /// Overrides the required correlation token width.
    #[must_use]
    pub const fn with_correlation_width(mut self, width: usize) -> Self {
        self.correlation_width = width;
        self
    }

    /// Overrides the safety validator.
    #[must_use]
    pub const fn with_validator(mut self, validator: SafetyValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the scoping policies this rewriter applies.
    #[must_use]
    pub const fn policies(&self) -> &ScopePolicySet {
        &self.policies
    }

    /// Returns the handler registry this rewriter dispatches on.
    #[must_use]
    pub const fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Rewrites a data request under the caller's identity.
    ///
    /// Registered handlers take precedence over the request's claimed kind;
    /// unregistered tables flow through the generic scoping policy, and
    /// unregistered procedures or custom queries pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::MissingScope`] when a scoped object is
    /// requested by an identity without a tenant scope value,
    /// [`RewriteError::InvalidParameter`] when a required secondary value is
    /// absent or malformed, and [`RewriteError::QueryRejected`] when a
    /// synthesized select fails safety validation.
    pub fn rewrite(
        &self,
        request: &DataRequest,
        identity: &Identity,
    ) -> Result<RewriteOutcome, RewriteError> {
        match self.handlers.handler_for(&request.object_id) {
            Some(ObjectHandler::ScopedProcedure {
                parameter,
            }) => self.bind_procedure(request, identity, parameter),
            Some(ObjectHandler::CorrelationQuery {
                column,
            }) => self.correlation_select(request, identity, column),
            None => match request.kind {
                RequestKind::Table => self.scope_table(request, identity),
                RequestKind::StoredProcedure | RequestKind::CustomQuery => {
                    Ok(RewriteOutcome::PassThrough)
                }
            },
        }
    }

    /// Binds the tenant scope onto a registered procedure call.
    fn bind_procedure(
        &self,
        request: &DataRequest,
        identity: &Identity,
        parameter: &str,
    ) -> Result<RewriteOutcome, RewriteError> {
        let scope = identity.tenant_scope().ok_or_else(|| {
            RewriteError::MissingScope("identity carries no tenant scope value".to_string())
        })?;
        let mut parameters = request.bound_parameters.clone();
        // The scope binding always wins over a caller-supplied parameter of
        // the same name.
        parameters.insert(parameter.to_string(), scope.to_string());
        Ok(RewriteOutcome::BoundProcedure {
            procedure: request.object_id.clone(),
            parameters,
        })
    }

    /// Synthesizes a select over the correlation column for a registered
    /// custom query.
    fn correlation_select(
        &self,
        request: &DataRequest,
        identity: &Identity,
        column: &str,
    ) -> Result<RewriteOutcome, RewriteError> {
        let Some(raw) = identity.correlation() else {
            return Err(RewriteError::InvalidParameter(
                "secondary correlation value is missing".to_string(),
            ));
        };
        fixed_width_token(raw, self.correlation_width)
            .map_err(|err| RewriteError::InvalidParameter(err.to_string()))?;
        self.scoped_select(&request.object_id, column, raw)
    }

    /// Applies the generic scoping policy to a table request.
    fn scope_table(
        &self,
        request: &DataRequest,
        identity: &Identity,
    ) -> Result<RewriteOutcome, RewriteError> {
        let Some(column) = self.policies.required_column(&request.object_id, identity.role) else {
            return Ok(RewriteOutcome::PassThrough);
        };
        let scope = identity.tenant_scope().ok_or_else(|| {
            RewriteError::MissingScope("identity carries no tenant scope value".to_string())
        })?;
        self.scoped_select(&request.object_id, column, scope)
    }

    /// Synthesizes and validates a scoped select over one column.
    fn scoped_select(
        &self,
        object_id: &ObjectId,
        column: &str,
        value: &str,
    ) -> Result<RewriteOutcome, RewriteError> {
        let escaped = escape_single_quotes(value);
        let text = format!("SELECT * FROM {object_id} WHERE {column} = '{escaped}'");
        let query = self.validator.validate(text.into())?;
        Ok(RewriteOutcome::ScopedQuery {
            query,
        })
    }
}
