// crates/rowgate-core/src/core/request.rs
// ============================================================================
// Module: Rowgate Data Requests
// Description: Inbound data request model and per-object handler registry.
// Purpose: Describe what a caller asked for and how known objects are handled.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A [`DataRequest`] names the object a caller wants and the request kind the
//! transport claimed for it. The [`HandlerRegistry`] maps well-known object
//! identifiers to tagged [`ObjectHandler`] entries; objects without an entry
//! fall through to the generic scoping policy. The registry replaces
//! string-matched dispatch with data, so adding a handled object is a
//! registration rather than a code change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ObjectId;

// ============================================================================
// SECTION: Request Model
// ============================================================================

/// Kind of data source the transport claimed for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Direct table or view access.
    Table,
    /// Stored procedure invocation.
    StoredProcedure,
    /// Registered custom query.
    CustomQuery,
}

impl RequestKind {
    /// Returns the stable lowercase label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::StoredProcedure => "stored_procedure",
            Self::CustomQuery => "custom_query",
        }
    }
}

/// Inbound request for a governed data object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Identifier of the requested object.
    pub object_id: ObjectId,
    /// Kind the transport claimed for the object.
    pub kind: RequestKind,
    /// Parameters already bound by the transport, if any.
    #[serde(default)]
    pub bound_parameters: BTreeMap<String, String>,
}

impl DataRequest {
    /// Creates a request with no pre-bound parameters.
    #[must_use]
    pub const fn new(object_id: ObjectId, kind: RequestKind) -> Self {
        Self {
            object_id,
            kind,
            bound_parameters: BTreeMap::new(),
        }
    }

    /// Adds a pre-bound parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bound_parameters.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// SECTION: Handler Registry
// ============================================================================

/// Handling strategy for a well-known object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum ObjectHandler {
    /// Stored procedure that receives the tenant scope as a named parameter.
    ScopedProcedure {
        /// Procedure parameter bound to the caller's tenant scope value.
        parameter: String,
    },
    /// Select synthesized over a correlation column checked against the
    /// caller's secondary correlation value.
    CorrelationQuery {
        /// Column compared against the validated correlation token.
        column: String,
    },
}

/// Registry of objects with dedicated handling strategies.
///
/// Lookup is exact on the object identifier. Objects absent from the registry
/// are not errors; they flow through the generic scoping policy instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerRegistry {
    /// Handler entries keyed by object identifier.
    handlers: BTreeMap<ObjectId, ObjectHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the handler for an object.
    pub fn register(&mut self, object_id: ObjectId, handler: ObjectHandler) {
        self.handlers.insert(object_id, handler);
    }

    /// Returns the handler for an object, when one is registered.
    #[must_use]
    pub fn handler_for(&self, object_id: &ObjectId) -> Option<&ObjectHandler> {
        self.handlers.get(object_id)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterates over registered handlers in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = (&ObjectId, &ObjectHandler)> {
        self.handlers.iter()
    }
}
