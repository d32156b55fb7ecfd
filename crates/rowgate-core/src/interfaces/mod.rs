// crates/rowgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rowgate Interfaces
// Description: Integration traits between the access layer and its host.
// Purpose: Define explicit seams for schema metadata lookups.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define the boundary between the access layer and the embedding
//! host. The host supplies schema metadata through [`ColumnCatalog`]; the
//! access layer derives its scoping policies from that metadata and never
//! talks to a database itself. Implementations must be deterministic for a
//! given schema snapshot, since policy derivation happens once per catalog
//! read rather than per request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ObjectId;
use crate::core::policy::ScopePolicy;
use crate::core::policy::ScopePolicySet;

// ============================================================================
// SECTION: Catalog Types
// ============================================================================

/// One (table, column) pair reported by the schema metadata source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table or view exposing the column.
    pub table: String,
    /// Column name as reported by the metadata source.
    pub column: String,
}

impl ColumnRef {
    /// Creates a column reference.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Errors surfaced by column catalog implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The metadata source could not be read.
    #[error("column catalog unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Catalog Trait
// ============================================================================

/// Source of schema metadata for policy derivation.
pub trait ColumnCatalog: Send + Sync {
    /// Lists every (table, column) pair known to the metadata source.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the metadata source cannot be read.
    fn list_columns(&self) -> Result<Vec<ColumnRef>, CatalogError>;

    /// Derives the scoping policy set for objects exposing `scoping_column`.
    ///
    /// Column name comparison folds ASCII case. Each matching object receives
    /// the default policy: ordinary users are scoped, admins are exempt.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the metadata source cannot be read.
    fn scope_policies(&self, scoping_column: &str) -> Result<ScopePolicySet, CatalogError> {
        let mut set = ScopePolicySet::new();
        for entry in self.list_columns()? {
            if entry.column.eq_ignore_ascii_case(scoping_column) {
                set.insert(ScopePolicy::new(ObjectId::new(entry.table), scoping_column));
            }
        }
        Ok(set)
    }
}

// ============================================================================
// SECTION: Static Catalog
// ============================================================================

/// In-memory catalog backed by an explicit column list.
///
/// Suitable for configuration-driven deployments and tests; hosts with live
/// schema access implement [`ColumnCatalog`] against their own metadata
/// queries instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticColumnCatalog {
    /// Column references returned by every listing.
    columns: Vec<ColumnRef>,
}

impl StaticColumnCatalog {
    /// Creates a catalog over an explicit column list.
    #[must_use]
    pub const fn new(columns: Vec<ColumnRef>) -> Self {
        Self {
            columns,
        }
    }

    /// Adds one column reference.
    #[must_use]
    pub fn with_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push(ColumnRef::new(table, column));
        self
    }
}

impl ColumnCatalog for StaticColumnCatalog {
    fn list_columns(&self) -> Result<Vec<ColumnRef>, CatalogError> {
        Ok(self.columns.clone())
    }
}
