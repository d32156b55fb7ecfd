// system-tests/tests/suites/pipeline.rs
// ============================================================================
// Module: Pipeline Tests
// Description: End-to-end identity resolution and query rewriting flows.
// Purpose: Confirm the three rewrite paths behave under the default config.
// Dependencies: system-tests helpers
// ============================================================================

//! End-to-end pipeline tests for Rowgate system-tests.

use helpers::gate;
use rowgate_config::RowgateConfig;
use rowgate_core::DataRequest;
use rowgate_core::ObjectId;
use rowgate_core::RequestKind;
use rowgate_core::RewriteOutcome;
use rowgate_core::Role;
use rowgate_core::SafetyValidator;

use crate::helpers;

#[test]
fn admin_table_request_passes_through() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("3"), None)?;
    if identity.role != Role::Admin {
        return Err("expected subject 3 to hold the admin role".into());
    }

    let request = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    if outcome != RewriteOutcome::PassThrough {
        return Err(format!("expected pass-through for admin, got {}", outcome.label()).into());
    }
    Ok(())
}

#[test]
fn user_table_request_is_scoped_to_the_tenant() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), None)?;
    if identity.role != Role::User {
        return Err("expected subject 7 to hold the user role".into());
    }

    let request = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    match outcome {
        RewriteOutcome::ScopedQuery {
            query,
        } => {
            let text = query.to_string();
            if text != "SELECT * FROM orders WHERE customer_id = '7'" {
                return Err(format!("unexpected scoped query: {text}").into());
            }
        }
        other => return Err(format!("expected scoped query, got {}", other.label()).into()),
    }
    Ok(())
}

#[test]
fn uncataloged_table_request_passes_through() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), None)?;

    let request = DataRequest::new(ObjectId::new("products"), RequestKind::Table);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    if outcome != RewriteOutcome::PassThrough {
        return Err(
            format!("expected pass-through for uncataloged table, got {}", outcome.label()).into()
        );
    }
    Ok(())
}

#[test]
fn registered_procedure_binds_the_tenant_parameter() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), None)?;

    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure)
        .with_parameter("limit", "10");
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    match outcome {
        RewriteOutcome::BoundProcedure {
            procedure,
            parameters,
        } => {
            if procedure.as_str() != "sp_customer_orders" {
                return Err(format!("unexpected procedure: {procedure}").into());
            }
            if parameters.get("customer").map(String::as_str) != Some("7") {
                return Err("expected tenant scope bound to the customer parameter".into());
            }
            if parameters.get("limit").map(String::as_str) != Some("10") {
                return Err("expected caller-supplied parameter to survive".into());
            }
        }
        other => return Err(format!("expected bound procedure, got {}", other.label()).into()),
    }
    Ok(())
}

#[test]
fn caller_cannot_spoof_the_bound_scope_parameter() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), None)?;

    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure)
        .with_parameter("customer", "999");
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    match outcome {
        RewriteOutcome::BoundProcedure {
            parameters, ..
        } => {
            if parameters.get("customer").map(String::as_str) != Some("7") {
                return Err("expected scope binding to replace the spoofed parameter".into());
            }
        }
        other => return Err(format!("expected bound procedure, got {}", other.label()).into()),
    }
    Ok(())
}

#[test]
fn registered_correlation_query_filters_on_the_order_token()
-> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), Some("42"))?;

    let request = DataRequest::new(ObjectId::new("customer_orders_details"), RequestKind::CustomQuery);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    match outcome {
        RewriteOutcome::ScopedQuery {
            query,
        } => {
            let text = query.to_string();
            if text != "SELECT * FROM customer_orders_details WHERE order_id = '42'" {
                return Err(format!("unexpected correlation query: {text}").into());
            }
        }
        other => return Err(format!("expected scoped query, got {}", other.label()).into()),
    }
    Ok(())
}

#[test]
fn unregistered_custom_query_passes_through() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let identity = gate::identity(&config, Some("7"), None)?;

    let request = DataRequest::new(ObjectId::new("dashboard_adhoc"), RequestKind::CustomQuery);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    if outcome != RewriteOutcome::PassThrough {
        return Err(
            format!("expected pass-through for unregistered query, got {}", outcome.label()).into()
        );
    }
    Ok(())
}

#[test]
fn synthesized_queries_satisfy_the_safety_validator() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let rewriter = gate::rewriter(&config)?;
    let validator = SafetyValidator::new();

    for subject in ["1", "7", "30"] {
        let identity = gate::identity(&config, Some(subject), Some("05"))?;
        for object in ["orders", "customer_orders"] {
            let request = DataRequest::new(ObjectId::new(object), RequestKind::Table);
            match rewriter.rewrite(&request, &identity)? {
                RewriteOutcome::ScopedQuery {
                    query,
                } => {
                    let verdict = validator.verdict(&query.to_string());
                    if !verdict.accepted {
                        return Err(
                            format!("synthesized query failed revalidation: {query}").into()
                        );
                    }
                }
                other => {
                    return Err(format!(
                        "expected scoped query for {object}, got {}",
                        other.label()
                    )
                    .into());
                }
            }
        }
    }
    Ok(())
}
