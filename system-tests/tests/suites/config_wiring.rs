// system-tests/tests/suites/config_wiring.rs
// ============================================================================
// Module: Config Wiring Tests
// Description: File configuration flowing into pipeline behavior.
// Purpose: Confirm loaded settings change resolution and rewriting end to end.
// Dependencies: system-tests helpers
// ============================================================================

//! Configuration wiring tests for Rowgate system-tests.

use std::fs;

use helpers::gate;
use rowgate_config::RowgateConfig;
use rowgate_core::DataRequest;
use rowgate_core::IdentityAuditEvent;
use rowgate_core::IdentityError;
use rowgate_core::ObjectId;
use rowgate_core::RequestKind;
use rowgate_core::RewriteOutcome;
use rowgate_core::Role;

use crate::helpers;

#[test]
fn file_overrides_flow_into_the_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rowgate.toml");
    fs::write(
        &path,
        r#"
[identity]
subject_max = 50

[scoping]
column = "account_id"
tables = ["invoices"]
"#,
    )?;

    let config = RowgateConfig::load(Some(&path))?;
    let identity = gate::identity(&config, Some("42"), None)?;
    let request = DataRequest::new(ObjectId::new("invoices"), RequestKind::Table);
    let outcome = gate::rewriter(&config)?.rewrite(&request, &identity)?;
    match outcome {
        RewriteOutcome::ScopedQuery {
            query,
        } => {
            let text = query.to_string();
            if text != "SELECT * FROM invoices WHERE account_id = '42'" {
                return Err(format!("unexpected scoped query: {text}").into());
            }
        }
        other => return Err(format!("expected scoped query, got {}", other.label()).into()),
    }
    Ok(())
}

#[test]
fn missing_subject_is_rejected_by_default() -> Result<(), Box<dyn std::error::Error>> {
    let config = RowgateConfig::default();
    let Err(reason) = gate::identity(&config, None, None) else {
        return Err("expected missing subject to abort resolution".into());
    };
    if !reason.contains("missing") {
        return Err(format!("unexpected rejection reason: {reason}").into());
    }
    Ok(())
}

#[test]
fn dev_fallback_resolves_missing_subjects() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rowgate.toml");
    fs::write(
        &path,
        r#"
[dev]
permit_missing_subject = true
"#,
    )?;

    let config = RowgateConfig::load(Some(&path))?;
    let identity = gate::identity(&config, None, None)?;
    if identity.subject_id.get() != 3 {
        return Err(format!("expected fallback subject 3, got {}", identity.subject_id).into());
    }
    if identity.role != Role::Admin {
        return Err("expected fallback subject to resolve through the admin allow-list".into());
    }
    Ok(())
}

#[test]
fn sentinel_subject_follows_the_fallback_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rowgate.toml");
    fs::write(
        &path,
        r#"
[dev]
permit_missing_subject = true
fallback_subject = 7
"#,
    )?;

    let config = RowgateConfig::load(Some(&path))?;
    let identity = gate::identity(&config, Some("0"), None)?;
    if identity.subject_id.get() != 7 {
        return Err(format!("expected fallback subject 7, got {}", identity.subject_id).into());
    }
    if identity.role != Role::User {
        return Err("expected fallback subject 7 to stay outside the admin allow-list".into());
    }
    Ok(())
}

#[test]
fn file_audit_sink_writes_json_lines() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let audit_path = dir.path().join("audit.jsonl");
    let config_path = dir.path().join("rowgate.toml");
    fs::write(
        &config_path,
        format!("[audit]\nsink = \"file\"\npath = \"{}\"\n", audit_path.display()),
    )?;

    let config = RowgateConfig::load(Some(&config_path))?;
    let sink = config.audit_sink()?;
    let identity = gate::identity(&config, Some("7"), None)?;
    sink.record_identity(&IdentityAuditEvent::resolved(&identity, false));
    sink.record_identity(&IdentityAuditEvent::rejected(
        Some("99"),
        &IdentityError::InvalidIdentity("subject out of range".to_string()),
    ));

    let contents = fs::read_to_string(&audit_path)?;
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() != 2 {
        return Err(format!("expected two audit lines, got {}", lines.len()).into());
    }
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line)?;
        if value["event"] != "identity_resolution" {
            return Err(format!("unexpected audit event: {line}").into());
        }
    }
    let first: serde_json::Value = serde_json::from_str(lines[0])?;
    let second: serde_json::Value = serde_json::from_str(lines[1])?;
    if first["allowed"] != true || second["allowed"] != false {
        return Err("expected one allowed and one rejected audit line".into());
    }
    if second["subject_header"] != "99" {
        return Err("expected the rejected line to carry the bounded header".into());
    }
    Ok(())
}
