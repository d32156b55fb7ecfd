// crates/rowgate-core/src/runtime/validator.rs
// ============================================================================
// Module: Rowgate Safety Validator
// Description: AST-level read-only enforcement for query text.
// Purpose: Accept exactly one read-only select; reject everything else.
// Dependencies: sqlparser, thiserror, crate::core::query
// ============================================================================

//! ## Overview
//! The safety validator is the only producer of [`ValidatedQuery`] values. It
//! parses candidate text with a real SQL parser and accepts it only when the
//! result is a single select statement whose every reachable sub-query is
//! itself a plain read. The walk rides the parser's own visitor, so
//! sub-queries in expression position (filters, projections, having clauses,
//! join constraints) are covered the same as bodies, CTEs, and table
//! sources. Keyword scanning is deliberately absent: acceptance is decided
//! on the parsed statement tree, so quoted strings, comments, and casing
//! tricks cannot smuggle a write through. Anything the walk does not
//! positively recognize as a read is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::ControlFlow;

use sqlparser::ast::Query;
use sqlparser::ast::SetExpr;
use sqlparser::ast::Statement;
use sqlparser::ast::TableFactor;
use sqlparser::ast::Visit;
use sqlparser::ast::Visitor;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

use crate::core::query::UnvalidatedQuery;
use crate::core::query::ValidatedQuery;
use crate::core::query::ValidationVerdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted query text size in bytes.
pub const MAX_QUERY_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced by safety validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Query text failed to parse; carries the first parser diagnostic.
    #[error("query parse failure: {0}")]
    ParseFailure(String),
    /// Query text parsed but is not a single read-only select.
    #[error("query rejected: {0}")]
    Rejected(String),
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// AST-based gate that admits only single read-only selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyValidator {
    /// Upper bound on accepted query text size in bytes.
    max_query_bytes: usize,
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyValidator {
    /// Creates a validator with the default size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_query_bytes: MAX_QUERY_BYTES,
        }
    }

    /// Overrides the maximum accepted query text size.
    #[must_use]
    pub const fn with_max_query_bytes(mut self, max_query_bytes: usize) -> Self {
        self.max_query_bytes = max_query_bytes;
        self
    }

    /// Validates query text, upgrading it to a [`ValidatedQuery`] on success.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParseFailure`] when the text does not parse
    /// and [`ValidationError::Rejected`] when it parses as anything other
    /// than exactly one read-only select.
    pub fn validate(&self, query: UnvalidatedQuery) -> Result<ValidatedQuery, ValidationError> {
        self.check_text(query.as_str())?;
        Ok(ValidatedQuery::approve(query.into_text()))
    }

    /// Produces a reporting verdict for query text without upgrading it.
    #[must_use]
    pub fn verdict(&self, text: &str) -> ValidationVerdict {
        match self.check_text(text) {
            Ok(()) => ValidationVerdict::accepted(),
            Err(err) => ValidationVerdict::rejected(err.to_string()),
        }
    }

    /// Runs the full acceptance check over raw text.
    fn check_text(&self, text: &str) -> Result<(), ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::Rejected("query text is empty".to_string()));
        }
        if text.len() > self.max_query_bytes {
            return Err(ValidationError::Rejected("query text exceeds size limit".to_string()));
        }
        let statements = Parser::parse_sql(&MySqlDialect {}, text)
            .map_err(|err| ValidationError::ParseFailure(err.to_string()))?;
        if statements.len() != 1 {
            return Err(ValidationError::Rejected(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )));
        }
        match statements.first() {
            Some(Statement::Query(query)) => walk_query_tree(query),
            _ => Err(ValidationError::Rejected(
                "statement is not a read-only select".to_string(),
            )),
        }
    }
}

// ============================================================================
// SECTION: Statement Walk
// ============================================================================

/// Walks every node reachable from an accepted top-level query.
///
/// Traversal is the parser's own visitor, which descends into sub-queries
/// wherever they occur, including expression positions the body walk alone
/// would miss. Recursion depth is bounded by the parser's own recursion
/// limit, which rejects pathologically nested input before the walk ever
/// sees it.
fn walk_query_tree(query: &Query) -> Result<(), ValidationError> {
    match query.visit(&mut ReadOnlyWalk) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(err) => Err(err),
    }
}

/// Visitor that rejects any node a plain read cannot contain.
struct ReadOnlyWalk;

impl Visitor for ReadOnlyWalk {
    type Break = ValidationError;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        // The walk enters below the top-level statement, so anything seen
        // here is nested inside the query tree, such as an insert body
        // behind EXISTS or IN.
        match statement {
            Statement::Query(_) => ControlFlow::Continue(()),
            _ => ControlFlow::Break(ValidationError::Rejected(
                "statement is not a read-only select".to_string(),
            )),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        match check_query_node(query) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }

    fn pre_visit_table_factor(&mut self, relation: &TableFactor) -> ControlFlow<Self::Break> {
        match relation {
            TableFactor::Table {
                ..
            }
            | TableFactor::Derived {
                ..
            }
            | TableFactor::NestedJoin {
                ..
            } => ControlFlow::Continue(()),
            _ => ControlFlow::Break(ValidationError::Rejected(
                "unsupported table source in read-only query".to_string(),
            )),
        }
    }
}

/// Checks one query node for locking clauses and body shape.
fn check_query_node(query: &Query) -> Result<(), ValidationError> {
    if !query.locks.is_empty() {
        return Err(ValidationError::Rejected(
            "locking clauses are not allowed in a read-only query".to_string(),
        ));
    }
    check_body(&query.body)
}

/// Checks a query body, allowing only selects and set operations over them.
///
/// A wrapped query gets its own visit, so only set-operation branches need
/// recursion here.
fn check_body(body: &SetExpr) -> Result<(), ValidationError> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                return Err(ValidationError::Rejected(
                    "select into targets are not allowed".to_string(),
                ));
            }
            Ok(())
        }
        SetExpr::Query(_) => Ok(()),
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            check_body(left)?;
            check_body(right)
        }
        _ => Err(ValidationError::Rejected("query body is not a plain select".to_string())),
    }
}
