// crates/rowgate-config/src/config.rs
// ============================================================================
// Module: Rowgate Configuration
// Description: Configuration loading and validation for Rowgate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rowgate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every embedded name that can reach synthesized SQL (scoping column, table
//! names, object ids, parameter names) must be identifier-shaped, so config
//! data can never smuggle quoting or statement separators into query text.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use rowgate_core::AuditSink;
use rowgate_core::ColumnRef;
use rowgate_core::DEFAULT_ADMIN_SUBJECTS;
use rowgate_core::DEFAULT_CORRELATION_WIDTH;
use rowgate_core::DEFAULT_SUBJECT_MAX;
use rowgate_core::DEFAULT_SUBJECT_MIN;
use rowgate_core::FileAuditSink;
use rowgate_core::HandlerRegistry;
use rowgate_core::IdentityRules;
use rowgate_core::NoopAuditSink;
use rowgate_core::ObjectHandler;
use rowgate_core::ObjectId;
use rowgate_core::StaticColumnCatalog;
use rowgate_core::StderrAuditSink;
use rowgate_core::SubjectId;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rowgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "ROWGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of an identifier-shaped config value.
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 64;
/// Maximum length of the connection host name.
pub(crate) const MAX_HOST_LENGTH: usize = 253;
/// Maximum number of admin allow-list entries.
pub(crate) const MAX_ADMIN_SUBJECTS: usize = 64;
/// Maximum number of scoped table entries.
pub(crate) const MAX_SCOPED_TABLES: usize = 256;
/// Maximum number of object handler entries.
pub(crate) const MAX_OBJECT_ENTRIES: usize = 128;
/// Maximum accepted correlation token width.
pub(crate) const MAX_CORRELATION_WIDTH: usize = 16;
/// Default development fallback subject (an admin in the default allow-list).
pub(crate) const DEFAULT_DEV_FALLBACK_SUBJECT: u64 = 3;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Rowgate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RowgateConfig {
    /// Data-source connection target.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Identity resolution rules.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Tenant scoping column and scoped tables.
    #[serde(default)]
    pub scoping: ScopingConfig,
    /// Object handler registry entries.
    #[serde(default = "default_object_entries")]
    pub objects: Vec<ObjectEntry>,
    /// Development-mode overrides (explicit opt-in only).
    #[serde(default)]
    pub dev: DevConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for RowgateConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            identity: IdentityConfig::default(),
            scoping: ScopingConfig::default(),
            objects: default_object_entries(),
            dev: DevConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl RowgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration, falling back to built-in defaults when neither an
    /// explicit path, the environment override, nor the default file names a
    /// config. An explicitly named file that is missing or invalid still
    /// fails; only the fully implicit case falls back.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly named config fails to load.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if path.is_some() || env::var(CONFIG_ENV_VAR).is_ok() {
            return Self::load(path);
        }
        if Path::new(DEFAULT_CONFIG_NAME).exists() {
            return Self::load(None);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()?;
        self.identity.validate()?;
        self.scoping.validate()?;
        self.dev.validate(&self.identity)?;
        self.audit.validate()?;
        validate_object_entries(&self.objects)?;
        Ok(())
    }

    /// Builds the identity rules injected into the resolver.
    ///
    /// The development fallback is carried only when explicitly enabled.
    #[must_use]
    pub fn identity_rules(&self) -> IdentityRules {
        let dev_fallback = if self.dev.permit_missing_subject {
            SubjectId::from_raw(self.dev.fallback_subject)
        } else {
            None
        };
        IdentityRules {
            subject_min: self.identity.subject_min,
            subject_max: self.identity.subject_max,
            admin_subjects: self.identity.admin_subjects.iter().copied().collect(),
            dev_fallback,
        }
    }

    /// Builds the handler registry from configured object entries.
    #[must_use]
    pub fn handler_registry(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        for entry in &self.objects {
            match entry {
                ObjectEntry::ScopedProcedure {
                    object,
                    parameter,
                } => {
                    registry.register(
                        ObjectId::new(object.clone()),
                        ObjectHandler::ScopedProcedure {
                            parameter: parameter.clone(),
                        },
                    );
                }
                ObjectEntry::CorrelationQuery {
                    object,
                    column,
                } => {
                    registry.register(
                        ObjectId::new(object.clone()),
                        ObjectHandler::CorrelationQuery {
                            column: column.clone(),
                        },
                    );
                }
            }
        }
        registry
    }

    /// Builds a static column catalog from the scoped table list.
    #[must_use]
    pub fn column_catalog(&self) -> StaticColumnCatalog {
        let columns = self
            .scoping
            .tables
            .iter()
            .map(|table| ColumnRef::new(table.clone(), self.scoping.column.clone()))
            .collect();
        StaticColumnCatalog::new(columns)
    }

    /// Assembles the outbound connection target.
    #[must_use]
    pub fn connection_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            host: self.connection.host.clone(),
            database: self.connection.database.clone(),
        }
    }

    /// Constructs the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file sink cannot be opened.
    pub fn audit_sink(&self) -> Result<Box<dyn AuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::Stderr => Ok(Box::new(StderrAuditSink)),
            AuditSinkKind::Disabled => Ok(Box::new(NoopAuditSink)),
            AuditSinkKind::File => {
                let Some(path) = &self.audit.path else {
                    return Err(ConfigError::Invalid(
                        "audit.path is required when audit.sink = file".to_string(),
                    ));
                };
                let sink = FileAuditSink::new(Path::new(path))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Box::new(sink))
            }
        }
    }
}

/// Data-source connection target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    /// Database server host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Database selected on the server.
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            database: default_database(),
        }
    }
}

impl ConnectionConfig {
    /// Validates the connection target.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("connection.host must be non-empty".to_string()));
        }
        if self.host.len() > MAX_HOST_LENGTH {
            return Err(ConfigError::Invalid("connection.host exceeds max length".to_string()));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "connection.host must not contain whitespace".to_string(),
            ));
        }
        validate_identifier("connection.database", &self.database)?;
        Ok(())
    }
}

/// Identity resolution rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityConfig {
    /// Lower bound (inclusive) for acceptable subject identifiers.
    #[serde(default = "default_subject_min")]
    pub subject_min: u64,
    /// Upper bound (inclusive) for acceptable subject identifiers.
    #[serde(default = "default_subject_max")]
    pub subject_max: u64,
    /// Subjects granted the administrator role.
    #[serde(default = "default_admin_subjects")]
    pub admin_subjects: Vec<u64>,
    /// Exact digit width required of the correlation token.
    #[serde(default = "default_correlation_width")]
    pub correlation_width: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            subject_min: default_subject_min(),
            subject_max: default_subject_max(),
            admin_subjects: default_admin_subjects(),
            correlation_width: default_correlation_width(),
        }
    }
}

impl IdentityConfig {
    /// Validates identity rules.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_min == 0 {
            return Err(ConfigError::Invalid(
                "identity.subject_min must be greater than zero".to_string(),
            ));
        }
        if self.subject_min > self.subject_max {
            return Err(ConfigError::Invalid(
                "identity.subject_min must not exceed identity.subject_max".to_string(),
            ));
        }
        if self.admin_subjects.len() > MAX_ADMIN_SUBJECTS {
            return Err(ConfigError::Invalid(
                "identity.admin_subjects exceeds entry limit".to_string(),
            ));
        }
        let unique: BTreeSet<u64> = self.admin_subjects.iter().copied().collect();
        if unique.len() != self.admin_subjects.len() {
            return Err(ConfigError::Invalid(
                "identity.admin_subjects contains duplicate entries".to_string(),
            ));
        }
        for subject in &self.admin_subjects {
            if !(self.subject_min..=self.subject_max).contains(subject) {
                return Err(ConfigError::Invalid(
                    "identity.admin_subjects entry outside the subject range".to_string(),
                ));
            }
        }
        if self.correlation_width == 0 {
            return Err(ConfigError::Invalid(
                "identity.correlation_width must be greater than zero".to_string(),
            ));
        }
        if self.correlation_width > MAX_CORRELATION_WIDTH {
            return Err(ConfigError::Invalid(
                "identity.correlation_width exceeds maximum".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tenant scoping configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScopingConfig {
    /// Column whose presence marks a table as tenant-scoped.
    #[serde(default = "default_scoping_column")]
    pub column: String,
    /// Tables known to carry the scoping column.
    #[serde(default = "default_scoped_tables")]
    pub tables: Vec<String>,
}

impl Default for ScopingConfig {
    fn default() -> Self {
        Self {
            column: default_scoping_column(),
            tables: default_scoped_tables(),
        }
    }
}

impl ScopingConfig {
    /// Validates the scoping column and table list.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("scoping.column", &self.column)?;
        if self.tables.len() > MAX_SCOPED_TABLES {
            return Err(ConfigError::Invalid("scoping.tables exceeds entry limit".to_string()));
        }
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            validate_identifier("scoping.tables entry", table)?;
            if !seen.insert(table.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(
                    "scoping.tables contains duplicate entries".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Object handler registry entry.
///
/// The `handler` tag selects the handling strategy; the remaining keys are
/// strategy-specific.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum ObjectEntry {
    /// Stored procedure receiving the tenant scope as a named parameter.
    ScopedProcedure {
        /// Object identifier the entry applies to.
        object: String,
        /// Procedure parameter bound to the tenant scope value.
        parameter: String,
    },
    /// Synthesized select filtered on the caller's correlation token.
    CorrelationQuery {
        /// Object identifier the entry applies to.
        object: String,
        /// Column compared against the correlation token.
        column: String,
    },
}

impl ObjectEntry {
    /// Returns the object identifier this entry applies to.
    #[must_use]
    pub const fn object(&self) -> &String {
        match self {
            Self::ScopedProcedure {
                object, ..
            }
            | Self::CorrelationQuery {
                object, ..
            } => object,
        }
    }

    /// Validates the entry's embedded names.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::ScopedProcedure {
                object,
                parameter,
            } => {
                validate_identifier("objects entry object", object)?;
                validate_identifier("objects entry parameter", parameter)?;
            }
            Self::CorrelationQuery {
                object,
                column,
            } => {
                validate_identifier("objects entry object", object)?;
                validate_identifier("objects entry column", column)?;
            }
        }
        Ok(())
    }
}

/// Development-mode overrides.
///
/// Off by default. Enabling `permit_missing_subject` lets requests without a
/// subject header resolve to the fallback subject instead of failing closed;
/// every such resolution is surfaced through the audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevConfig {
    /// Resolve missing subject headers to the fallback subject.
    #[serde(default)]
    pub permit_missing_subject: bool,
    /// Subject assumed when the subject header is missing.
    #[serde(default = "default_dev_fallback_subject")]
    pub fallback_subject: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            permit_missing_subject: false,
            fallback_subject: default_dev_fallback_subject(),
        }
    }
}

impl DevConfig {
    /// Validates dev overrides against the identity rules.
    fn validate(&self, identity: &IdentityConfig) -> Result<(), ConfigError> {
        if !self.permit_missing_subject {
            return Ok(());
        }
        if self.fallback_subject == 0 {
            return Err(ConfigError::Invalid(
                "dev.fallback_subject must be greater than zero".to_string(),
            ));
        }
        if !(identity.subject_min..=identity.subject_max).contains(&self.fallback_subject) {
            return Err(ConfigError::Invalid(
                "dev.fallback_subject outside the subject range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditConfig {
    /// Destination for audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Append-only file path, required when `sink = "file"`.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates the sink selection.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required when audit.sink = file".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::Disabled, Some(_)) => Err(
                ConfigError::Invalid("audit.path only applies when audit.sink = file".to_string()),
            ),
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::Stderr | AuditSinkKind::Disabled, None) => Ok(()),
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on standard error.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard all audit events.
    Disabled,
}

/// Resolved data-source connection target assembled from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTarget {
    /// Database server host name.
    pub host: String,
    /// Database selected on the server.
    pub database: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an identifier-shaped config value.
///
/// Identifier-shaped values (ASCII letters, digits, underscores, leading
/// non-digit) cannot introduce quoting or statement separators when
/// substituted into synthesized selects.
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let bytes = value.as_bytes();
    let Some(&first) = bytes.first() else {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    };
    if bytes.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max identifier length")));
    }
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return Err(ConfigError::Invalid(format!(
            "{field} must start with a letter or underscore"
        )));
    }
    if !bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(ConfigError::Invalid(format!(
            "{field} must contain only letters, digits, and underscores"
        )));
    }
    Ok(())
}

/// Validates object handler entries as a set.
fn validate_object_entries(entries: &[ObjectEntry]) -> Result<(), ConfigError> {
    if entries.len() > MAX_OBJECT_ENTRIES {
        return Err(ConfigError::Invalid("objects exceeds entry limit".to_string()));
    }
    let mut seen = BTreeSet::new();
    for entry in entries {
        entry.validate()?;
        if !seen.insert(entry.object().to_ascii_lowercase()) {
            return Err(ConfigError::Invalid(
                "objects entries contain duplicate object ids".to_string(),
            ));
        }
    }
    Ok(())
}

/// Default database server host name.
fn default_host() -> String {
    "localhost".to_string()
}

/// Default database name.
fn default_database() -> String {
    "northwind".to_string()
}

/// Default lower bound for subject identifiers.
const fn default_subject_min() -> u64 {
    DEFAULT_SUBJECT_MIN
}

/// Default upper bound for subject identifiers.
const fn default_subject_max() -> u64 {
    DEFAULT_SUBJECT_MAX
}

/// Default admin allow-list.
fn default_admin_subjects() -> Vec<u64> {
    DEFAULT_ADMIN_SUBJECTS.to_vec()
}

/// Default correlation token width.
const fn default_correlation_width() -> usize {
    DEFAULT_CORRELATION_WIDTH
}

/// Default scoping column name.
fn default_scoping_column() -> String {
    "customer_id".to_string()
}

/// Default scoped table list.
fn default_scoped_tables() -> Vec<String> {
    vec!["customer_orders".to_string(), "orders".to_string()]
}

/// Default object handler entries.
fn default_object_entries() -> Vec<ObjectEntry> {
    vec![
        ObjectEntry::ScopedProcedure {
            object: "sp_customer_orders".to_string(),
            parameter: "customer".to_string(),
        },
        ObjectEntry::CorrelationQuery {
            object: "customer_orders_details".to_string(),
            column: "order_id".to_string(),
        },
    ]
}

/// Default development fallback subject.
const fn default_dev_fallback_subject() -> u64 {
    DEFAULT_DEV_FALLBACK_SUBJECT
}

// ============================================================================
// SECTION: Tests
// ============================================================================
