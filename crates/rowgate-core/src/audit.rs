// crates/rowgate-core/src/audit.rs
// ============================================================================
// Module: Rowgate Audit Logging
// Description: Structured audit events for access-control decisions.
// Purpose: Emit decision trails without hard logging dependencies.
// Dependencies: serde, serde_json, crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for the access layer.
//! Every identity resolution, rewrite decision, and validation verdict can be
//! recorded as a JSON line. It is intentionally lightweight so deployments
//! can route events to their preferred logging pipeline without redesign.
//! Raw query text is never logged; events carry sizes and reasons instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::identifiers::SubjectId;
use crate::core::identity::Identity;
use crate::core::identity::IdentityError;
use crate::core::identity::Role;
use crate::core::query::ValidationVerdict;
use crate::core::request::DataRequest;
use crate::core::request::RequestKind;
use crate::runtime::rewriter::RewriteError;
use crate::runtime::rewriter::RewriteOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters of untrusted header text carried in an audit event.
const MAX_AUDIT_LABEL_CHARS: usize = 64;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identity resolution audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Whether an identity was produced.
    pub allowed: bool,
    /// Resolved subject identifier when resolution succeeded.
    pub subject: Option<SubjectId>,
    /// Resolved role when resolution succeeded.
    pub role: Option<Role>,
    /// Whether the development fallback identity was substituted.
    pub fallback: bool,
    /// Raw subject header (bounded) when resolution failed.
    pub subject_header: Option<String>,
    /// Rejection reason when resolution failed.
    pub reason: Option<String>,
}

/// Query rewrite audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requested object identifier.
    pub object_id: String,
    /// Request kind claimed by the transport.
    pub kind: RequestKind,
    /// Subject the decision was made for.
    pub subject: SubjectId,
    /// Role the decision was made for.
    pub role: Role,
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Outcome label when the request may proceed.
    pub outcome: Option<&'static str>,
    /// Denial reason when the request was aborted.
    pub reason: Option<String>,
}

/// Safety validation audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Whether the text was accepted as a single read-only select.
    pub accepted: bool,
    /// Size of the checked text in bytes.
    pub query_bytes: usize,
    /// Rejection reason when the text was refused.
    pub reason: Option<String>,
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
    /// Whether the development fallback identity is enabled.
    pub dev_fallback: bool,
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

impl IdentityAuditEvent {
    /// Creates an event for a successful resolution.
    #[must_use]
    pub fn resolved(identity: &Identity, fallback: bool) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "identity_resolution",
            timestamp_ms,
            allowed: true,
            subject: Some(identity.subject_id),
            role: Some(identity.role),
            fallback,
            subject_header: None,
            reason: None,
        }
    }

    /// Creates an event for a rejected resolution.
    #[must_use]
    pub fn rejected(subject_header: Option<&str>, error: &IdentityError) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "identity_resolution",
            timestamp_ms,
            allowed: false,
            subject: None,
            role: None,
            fallback: false,
            subject_header: subject_header.map(truncate_label),
            reason: Some(error.to_string()),
        }
    }
}

impl RewriteAuditEvent {
    /// Creates an event for a completed rewrite decision.
    #[must_use]
    pub fn allowed(request: &DataRequest, identity: &Identity, outcome: &RewriteOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "rewrite_decision",
            timestamp_ms,
            object_id: request.object_id.to_string(),
            kind: request.kind,
            subject: identity.subject_id,
            role: identity.role,
            allowed: true,
            outcome: Some(outcome.label()),
            reason: None,
        }
    }

    /// Creates an event for an aborted rewrite.
    #[must_use]
    pub fn denied(request: &DataRequest, identity: &Identity, error: &RewriteError) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "rewrite_decision",
            timestamp_ms,
            object_id: request.object_id.to_string(),
            kind: request.kind,
            subject: identity.subject_id,
            role: identity.role,
            allowed: false,
            outcome: None,
            reason: Some(error.to_string()),
        }
    }
}

impl ValidationAuditEvent {
    /// Creates an event from a validation verdict.
    #[must_use]
    pub fn from_verdict(query_bytes: usize, verdict: &ValidationVerdict) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "query_validation",
            timestamp_ms,
            accepted: verdict.accepted,
            query_bytes,
            reason: verdict.reason.clone(),
        }
    }
}

impl SecurityAuditEvent {
    /// Creates an event flagging that the development fallback is active.
    #[must_use]
    pub fn dev_fallback_enabled(fallback: SubjectId) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "security_posture",
            timestamp_ms,
            kind: "dev_fallback_enabled".to_string(),
            message: Some(format!(
                "missing subjects resolve to fallback subject {fallback}; disable outside development"
            )),
            dev_fallback: true,
        }
    }
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Destination for access-control audit events.
pub trait AuditSink: Send + Sync {
    /// Record an identity resolution event.
    fn record_identity(&self, event: &IdentityAuditEvent);

    /// Record a rewrite decision event.
    fn record_rewrite(&self, _event: &RewriteAuditEvent) {}

    /// Record a validation verdict event.
    fn record_validation(&self, _event: &ValidationAuditEvent) {}

    /// Record a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_identity(&self, event: &IdentityAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_rewrite(&self, event: &RewriteAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record_identity(&self, event: &IdentityAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }

    fn record_rewrite(&self, event: &RewriteAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_identity(&self, _event: &IdentityAuditEvent) {}

    fn record_rewrite(&self, _event: &RewriteAuditEvent) {}

    fn record_validation(&self, _event: &ValidationAuditEvent) {}

    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Bounds untrusted header text before it enters an audit event.
fn truncate_label(value: &str) -> String {
    if value.chars().count() <= MAX_AUDIT_LABEL_CHARS {
        return value.to_string();
    }
    value.chars().take(MAX_AUDIT_LABEL_CHARS).collect()
}
