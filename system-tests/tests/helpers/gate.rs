// system-tests/tests/helpers/gate.rs
// ============================================================================
// Module: Pipeline Assembly Helpers
// Description: Builders wiring configuration into resolver and rewriter.
// Purpose: Keep suite-level pipeline construction consistent and short.
// Dependencies: rowgate-config, rowgate-core
// ============================================================================

//! Helpers for assembling the Rowgate pipeline from configuration.

use rowgate_config::RowgateConfig;
use rowgate_core::ColumnCatalog;
use rowgate_core::Identity;
use rowgate_core::IdentityResolver;
use rowgate_core::QueryRewriter;
use rowgate_core::RequestHeaders;

/// Builds the identity resolver configured by `config`.
#[must_use]
pub fn resolver(config: &RowgateConfig) -> IdentityResolver {
    IdentityResolver::new(config.identity_rules())
}

/// Builds the query rewriter configured by `config`.
pub fn rewriter(config: &RowgateConfig) -> Result<QueryRewriter, String> {
    let catalog = config.column_catalog();
    let policies = catalog
        .scope_policies(&config.scoping.column)
        .map_err(|err| format!("derive scope policies: {err}"))?;
    Ok(QueryRewriter::new(policies, config.handler_registry())
        .with_correlation_width(config.identity.correlation_width))
}

/// Resolves an identity from optional raw header values.
pub fn identity(
    config: &RowgateConfig,
    subject: Option<&str>,
    correlation: Option<&str>,
) -> Result<Identity, String> {
    let mut headers = RequestHeaders::new();
    if let Some(subject) = subject {
        headers = headers.with_subject(subject);
    }
    if let Some(correlation) = correlation {
        headers = headers.with_correlation(correlation);
    }
    resolver(config).resolve(&headers).map_err(|err| format!("resolve identity: {err}"))
}
