// crates/rowgate-core/tests/rewriter.rs
// ============================================================================
// Module: Query Rewriter Tests
// Description: Tests for registry dispatch, scoping, and outcome synthesis.
// Purpose: Ensure every request path honors tenant scoping end to end.
// Dependencies: rowgate-core
// ============================================================================
//! ## Overview
//! Validates the rewrite decision table: registered procedures bind the
//! tenant scope, registered correlation queries gate the secondary value,
//! policy-covered tables are scoped for users and exempt for admins, and
//! everything else passes through. Synthesized text must always clear the
//! safety validator before it appears in an outcome.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use panic-based assertions on deterministic fixtures."
)]

use std::collections::BTreeMap;

use rowgate_core::ColumnCatalog;
use rowgate_core::DataRequest;
use rowgate_core::HandlerRegistry;
use rowgate_core::Identity;
use rowgate_core::IdentityResolver;
use rowgate_core::IdentityRules;
use rowgate_core::ObjectHandler;
use rowgate_core::ObjectId;
use rowgate_core::QueryRewriter;
use rowgate_core::RequestHeaders;
use rowgate_core::RequestKind;
use rowgate_core::RewriteError;
use rowgate_core::RewriteOutcome;
use rowgate_core::Role;
use rowgate_core::ScopePolicySet;
use rowgate_core::StaticColumnCatalog;
use rowgate_core::SubjectId;

fn sample_policies() -> ScopePolicySet {
    StaticColumnCatalog::default()
        .with_column("orders", "customer_id")
        .with_column("customer_orders", "customer_id")
        .scope_policies("customer_id")
        .expect("derive policies")
}

fn sample_handlers() -> HandlerRegistry {
    let mut handlers = HandlerRegistry::new();
    handlers.register(
        ObjectId::new("sp_customer_orders"),
        ObjectHandler::ScopedProcedure {
            parameter: "customer".to_string(),
        },
    );
    handlers.register(
        ObjectId::new("customer_orders_details"),
        ObjectHandler::CorrelationQuery {
            column: "order_id".to_string(),
        },
    );
    handlers
}

fn sample_rewriter() -> QueryRewriter {
    QueryRewriter::new(sample_policies(), sample_handlers())
}

fn identity_for(subject: &str, correlation: Option<&str>) -> Identity {
    let mut headers = RequestHeaders::new().with_subject(subject);
    if let Some(correlation) = correlation {
        headers = headers.with_correlation(correlation);
    }
    IdentityResolver::new(IdentityRules::default()).resolve(&headers).expect("identity resolves")
}

fn scoped_text(outcome: &RewriteOutcome) -> &str {
    match outcome {
        RewriteOutcome::ScopedQuery {
            query,
        } => query.as_str(),
        other => panic!("expected scoped query, got {}", other.label()),
    }
}

#[test]
fn user_table_request_becomes_scoped_select() {
    let request = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    assert_eq!(scoped_text(&outcome), "SELECT * FROM orders WHERE customer_id = '7'");
}

#[test]
fn admin_table_request_passes_through() {
    let request = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("3", None)).expect("rewrite succeeds");
    assert_eq!(outcome, RewriteOutcome::PassThrough);
}

#[test]
fn unlisted_table_passes_through_for_all_roles() {
    let request = DataRequest::new(ObjectId::new("products"), RequestKind::Table);
    for subject in ["7", "3"] {
        let outcome = sample_rewriter()
            .rewrite(&request, &identity_for(subject, None))
            .expect("rewrite succeeds");
        assert_eq!(outcome, RewriteOutcome::PassThrough);
    }
}

#[test]
fn policy_lookup_folds_table_name_case() {
    let request = DataRequest::new(ObjectId::new("ORDERS"), RequestKind::Table);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    assert_eq!(scoped_text(&outcome), "SELECT * FROM ORDERS WHERE customer_id = '7'");
}

#[test]
fn registered_procedure_binds_the_tenant_scope() {
    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    let RewriteOutcome::BoundProcedure {
        procedure,
        parameters,
    } = outcome
    else {
        panic!("expected bound procedure");
    };
    assert_eq!(procedure, ObjectId::new("sp_customer_orders"));
    assert_eq!(parameters, BTreeMap::from([("customer".to_string(), "7".to_string())]));
}

#[test]
fn procedure_binding_preserves_other_parameters() {
    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure)
        .with_parameter("status", "open");
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    let RewriteOutcome::BoundProcedure {
        parameters,
        ..
    } = outcome
    else {
        panic!("expected bound procedure");
    };
    assert_eq!(parameters.get("status").map(String::as_str), Some("open"));
    assert_eq!(parameters.get("customer").map(String::as_str), Some("7"));
}

#[test]
fn callers_cannot_preset_the_scope_parameter() {
    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure)
        .with_parameter("customer", "29");
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    let RewriteOutcome::BoundProcedure {
        parameters,
        ..
    } = outcome
    else {
        panic!("expected bound procedure");
    };
    assert_eq!(parameters.get("customer").map(String::as_str), Some("7"));
}

#[test]
fn registry_dispatch_outranks_the_claimed_kind() {
    // Claiming a registered procedure is a plain table must not bypass the
    // handler.
    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::Table);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    assert_eq!(outcome.label(), "bound_procedure");
}

#[test]
fn procedures_bind_scope_for_admins_too() {
    let request = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("3", None)).expect("rewrite succeeds");
    assert_eq!(outcome.label(), "bound_procedure");
}

#[test]
fn correlation_query_embeds_the_validated_token() {
    let request = DataRequest::new(ObjectId::new("customer_orders_details"), RequestKind::CustomQuery);
    let outcome = sample_rewriter()
        .rewrite(&request, &identity_for("7", Some("42")))
        .expect("rewrite succeeds");
    assert_eq!(
        scoped_text(&outcome),
        "SELECT * FROM customer_orders_details WHERE order_id = '42'"
    );
}

#[test]
fn correlation_value_must_match_the_fixed_width() {
    let rewriter = sample_rewriter();
    let request = DataRequest::new(ObjectId::new("customer_orders_details"), RequestKind::CustomQuery);
    for correlation in ["7", "123", "4'", "ab", "4 "] {
        let err = rewriter
            .rewrite(&request, &identity_for("7", Some(correlation)))
            .expect_err("malformed correlation must abort");
        assert!(
            matches!(err, RewriteError::InvalidParameter(_)),
            "{correlation:?} gave {err}"
        );
    }
}

#[test]
fn missing_correlation_value_aborts_the_request() {
    let request = DataRequest::new(ObjectId::new("customer_orders_details"), RequestKind::CustomQuery);
    let err = sample_rewriter()
        .rewrite(&request, &identity_for("7", None))
        .expect_err("missing correlation must abort");
    assert!(matches!(err, RewriteError::InvalidParameter(_)));
}

#[test]
fn unregistered_custom_queries_pass_through() {
    let request = DataRequest::new(ObjectId::new("monthly_rollup"), RequestKind::CustomQuery);
    let outcome =
        sample_rewriter().rewrite(&request, &identity_for("7", None)).expect("rewrite succeeds");
    assert_eq!(outcome, RewriteOutcome::PassThrough);
}

#[test]
fn identities_without_tenant_scope_are_refused_scoped_objects() {
    let identity = Identity {
        subject_id: SubjectId::from_raw(7).expect("nonzero"),
        role: Role::User,
        scope: BTreeMap::new(),
    };
    let rewriter = sample_rewriter();

    let table = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let err = rewriter.rewrite(&table, &identity).expect_err("scoped table needs scope");
    assert!(matches!(err, RewriteError::MissingScope(_)));

    let procedure = DataRequest::new(ObjectId::new("sp_customer_orders"), RequestKind::StoredProcedure);
    let err = rewriter.rewrite(&procedure, &identity).expect_err("procedure needs scope");
    assert!(matches!(err, RewriteError::MissingScope(_)));
}

#[test]
fn crafted_object_identifiers_fail_validation() {
    let policies = ScopePolicySet::from_policies([rowgate_core::ScopePolicy::new(
        ObjectId::new("orders; DROP TABLE orders"),
        "customer_id",
    )]);
    let rewriter = QueryRewriter::new(policies, HandlerRegistry::new());
    let request = DataRequest::new(ObjectId::new("orders; DROP TABLE orders"), RequestKind::Table);
    let err = rewriter
        .rewrite(&request, &identity_for("7", None))
        .expect_err("hostile object identifier must be refused");
    assert!(matches!(err, RewriteError::QueryRejected(_)), "got {err}");
}

#[test]
fn quote_bearing_scope_values_are_escaped_into_one_literal() {
    let mut scope = BTreeMap::new();
    scope.insert("tenant".to_string(), "7' OR '1'='1".to_string());
    let identity = Identity {
        subject_id: SubjectId::from_raw(7).expect("nonzero"),
        role: Role::User,
        scope,
    };
    let request = DataRequest::new(ObjectId::new("orders"), RequestKind::Table);
    let outcome = sample_rewriter().rewrite(&request, &identity).expect("escaped value validates");
    assert_eq!(
        scoped_text(&outcome),
        "SELECT * FROM orders WHERE customer_id = '7'' OR ''1''=''1'"
    );
}

#[test]
fn correlation_width_is_configurable() {
    let rewriter = sample_rewriter().with_correlation_width(4);
    let request = DataRequest::new(ObjectId::new("customer_orders_details"), RequestKind::CustomQuery);
    rewriter
        .rewrite(&request, &identity_for("7", Some("42")))
        .expect_err("two digits no longer fit");
    let outcome = rewriter
        .rewrite(&request, &identity_for("7", Some("1234")))
        .expect("four digits fit");
    assert_eq!(outcome.label(), "scoped_query");
}
