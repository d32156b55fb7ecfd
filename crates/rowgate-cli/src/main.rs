// crates/rowgate-cli/src/main.rs
// ============================================================================
// Module: Rowgate CLI Entry Point
// Description: Command dispatcher for offline access-control workflows.
// Purpose: Dry-run rewrites, check query text, and inspect effective policy.
// Dependencies: clap, rowgate-config, rowgate-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The Rowgate CLI exercises the access-control pipeline without a database:
//! `plan` resolves an identity and rewrites one request, `check-sql` runs the
//! read-only safety validator over query text, `policies` prints the
//! effective scope policy set, and `config` validates or prints configuration.
//! Inputs are untrusted and size-bounded; audit events flow to the configured
//! sink exactly as they would in an embedding application.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rowgate_config::ConnectionTarget;
use rowgate_config::RowgateConfig;
use rowgate_config::config_toml_example;
use rowgate_core::ColumnCatalog;
use rowgate_core::DataRequest;
use rowgate_core::HandlerRegistry;
use rowgate_core::IdentityAuditEvent;
use rowgate_core::IdentityResolver;
use rowgate_core::MAX_QUERY_BYTES;
use rowgate_core::ObjectHandler;
use rowgate_core::ObjectId;
use rowgate_core::QueryRewriter;
use rowgate_core::RequestHeaders;
use rowgate_core::RequestKind;
use rowgate_core::RewriteAuditEvent;
use rowgate_core::RewriteOutcome;
use rowgate_core::Role;
use rowgate_core::SafetyValidator;
use rowgate_core::ScopePolicy;
use rowgate_core::ScopePolicySet;
use rowgate_core::SecurityAuditEvent;
use rowgate_core::SubjectId;
use rowgate_core::ValidationAuditEvent;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of query text inputs (argument, file, or stdin).
const MAX_SQL_INPUT_BYTES: usize = MAX_QUERY_BYTES;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rowgate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an identity and dry-run one request rewrite.
    Plan(PlanCommand),
    /// Check query text against the read-only safety validator.
    CheckSql(CheckSqlCommand),
    /// Print the effective scope policies and object handlers.
    Policies(PoliciesCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `plan` command.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Optional config file path (defaults to rowgate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Subject header value presented by the caller.
    #[arg(long, value_name = "SUBJECT")]
    subject: Option<String>,
    /// Correlation header value presented by the caller.
    #[arg(long, value_name = "TOKEN")]
    correlation: Option<String>,
    /// Requested object identifier (table, procedure, or registered name).
    #[arg(long, value_name = "OBJECT")]
    object: String,
    /// Request kind claimed by the transport.
    #[arg(long, value_enum, value_name = "KIND", default_value_t = KindArg::Table)]
    kind: KindArg,
    /// Already-bound parameter as NAME=VALUE (repeatable).
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
    /// Emit the outcome as a JSON object.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Configuration for the `check-sql` command.
#[derive(Args, Debug)]
struct CheckSqlCommand {
    /// Query text to check (reads stdin when neither text nor --file given).
    #[arg(value_name = "SQL")]
    sql: Option<String>,
    /// Read query text from a file instead of the command line.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Optional config file path (selects the audit sink).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit the verdict as a JSON object.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Configuration for the `policies` command.
#[derive(Args, Debug)]
struct PoliciesCommand {
    /// Optional config file path (defaults to rowgate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit the policy set as a JSON object.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a Rowgate configuration file.
    Validate(ConfigValidateCommand),
    /// Print a canonical example configuration.
    Example,
}

/// Configuration for the `config validate` command.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to rowgate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Request kind argument accepted by `plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// Plain table or view request.
    Table,
    /// Stored procedure request.
    StoredProcedure,
    /// Ad-hoc custom query request.
    CustomQuery,
}

impl KindArg {
    /// Maps the CLI argument onto the core request kind.
    const fn into_kind(self) -> RequestKind {
        match self {
            Self::Table => RequestKind::Table,
            Self::StoredProcedure => RequestKind::StoredProcedure,
            Self::CustomQuery => RequestKind::CustomQuery,
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Serializable outcome of a `plan` dry run.
#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    /// Resolved subject identifier.
    subject: SubjectId,
    /// Resolved role.
    role: Role,
    /// Whether the development fallback produced the identity.
    fallback: bool,
    /// Outbound connection target from configuration.
    connection: &'a ConnectionTarget,
    /// Rewrite outcome for the request.
    outcome: &'a RewriteOutcome,
}

/// Serializable effective-policy listing.
#[derive(Debug, Serialize)]
struct PoliciesReport<'a> {
    /// Configured scoping column.
    scoping_column: &'a str,
    /// Policies derived from the column catalog.
    policies: Vec<&'a ScopePolicy>,
    /// Registered object handlers.
    handlers: BTreeMap<&'a ObjectId, &'a ObjectHandler>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("rowgate {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Plan(command) => command_plan(command),
        Commands::CheckSql(command) => command_check_sql(command),
        Commands::Policies(command) => command_policies(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Plan Command
// ============================================================================

/// Executes the `plan` command.
fn command_plan(command: PlanCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let sink = config
        .audit_sink()
        .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;

    let rules = config.identity_rules();
    if let Some(fallback) = rules.dev_fallback {
        sink.record_security(&SecurityAuditEvent::dev_fallback_enabled(fallback));
    }

    let mut headers = RequestHeaders::new();
    if let Some(subject) = command.subject {
        headers = headers.with_subject(subject);
    }
    if let Some(correlation) = command.correlation {
        headers = headers.with_correlation(correlation);
    }

    let resolver = IdentityResolver::new(rules);
    let identity = match resolver.resolve(&headers) {
        Ok(identity) => identity,
        Err(err) => {
            sink.record_identity(&IdentityAuditEvent::rejected(headers.subject.as_deref(), &err));
            return Err(CliError::new(err.to_string()));
        }
    };
    let fallback = headers.subject_is_missing();
    sink.record_identity(&IdentityAuditEvent::resolved(&identity, fallback));

    let mut request = DataRequest::new(ObjectId::new(command.object), command.kind.into_kind());
    for raw in &command.params {
        let (name, value) = parse_bound_parameter(raw)?;
        request = request.with_parameter(name, value);
    }

    let catalog = config.column_catalog();
    let policies = catalog
        .scope_policies(&config.scoping.column)
        .map_err(|err| CliError::new(format!("failed to derive scope policies: {err}")))?;
    let rewriter = QueryRewriter::new(policies, config.handler_registry())
        .with_correlation_width(config.identity.correlation_width);

    let outcome = match rewriter.rewrite(&request, &identity) {
        Ok(outcome) => outcome,
        Err(err) => {
            sink.record_rewrite(&RewriteAuditEvent::denied(&request, &identity, &err));
            return Err(CliError::new(err.to_string()));
        }
    };
    sink.record_rewrite(&RewriteAuditEvent::allowed(&request, &identity, &outcome));

    let connection = config.connection_target();
    let report = PlanReport {
        subject: identity.subject_id,
        role: identity.role,
        fallback,
        connection: &connection,
        outcome: &outcome,
    };
    if command.json {
        let payload = serde_json::to_string(&report)
            .map_err(|err| CliError::new(format!("failed to encode plan output: {err}")))?;
        write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    } else {
        for line in render_plan_text(&report) {
            write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders the plan report in text form.
fn render_plan_text(report: &PlanReport<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let fallback_note = if report.fallback { " (dev fallback)" } else { "" };
    lines.push(format!(
        "subject: {} ({}){fallback_note}",
        report.subject,
        report.role.as_str()
    ));
    lines.push(format!("connection: {}/{}", report.connection.host, report.connection.database));
    match report.outcome {
        RewriteOutcome::PassThrough => {
            lines.push("action: pass_through".to_string());
        }
        RewriteOutcome::BoundProcedure {
            procedure,
            parameters,
        } => {
            lines.push("action: bound_procedure".to_string());
            lines.push(format!("procedure: {procedure}"));
            for (name, value) in parameters {
                lines.push(format!("  {name} = {value}"));
            }
        }
        RewriteOutcome::ScopedQuery {
            query,
        } => {
            lines.push("action: scoped_query".to_string());
            lines.push(format!("query: {query}"));
        }
    }
    lines
}

// ============================================================================
// SECTION: Check-SQL Command
// ============================================================================

/// Executes the `check-sql` command.
fn command_check_sql(command: CheckSqlCommand) -> CliResult<ExitCode> {
    let text = read_sql_input(command.sql, command.file.as_deref())?;
    let config = load_config(command.config.as_deref())?;
    let sink = config
        .audit_sink()
        .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;

    let verdict = SafetyValidator::new().verdict(&text);
    sink.record_validation(&ValidationAuditEvent::from_verdict(text.len(), &verdict));

    if command.json {
        let payload = serde_json::to_string(&verdict)
            .map_err(|err| CliError::new(format!("failed to encode verdict output: {err}")))?;
        write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    } else if verdict.accepted {
        write_stdout_line("accepted")
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    } else {
        let reason = verdict.reason.as_deref().unwrap_or("rejected");
        write_stdout_line(&format!("rejected: {reason}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    if verdict.accepted { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Resolves the query text from argument, file, or stdin.
fn read_sql_input(sql: Option<String>, file: Option<&Path>) -> CliResult<String> {
    match (sql, file) {
        (Some(_), Some(_)) => {
            Err(CliError::new("provide query text or --file, not both".to_string()))
        }
        (Some(text), None) => Ok(text),
        (None, Some(path)) => {
            let bytes = read_bytes_with_limit(path, MAX_SQL_INPUT_BYTES).map_err(|err| match err {
                ReadLimitError::Io(err) => {
                    CliError::new(format!("failed to read {}: {err}", path.display()))
                }
                ReadLimitError::TooLarge {
                    size,
                    limit,
                } => CliError::new(format!(
                    "query input {} exceeds size limit ({size} > {limit})",
                    path.display()
                )),
            })?;
            String::from_utf8(bytes)
                .map_err(|_| CliError::new("query input must be utf-8".to_string()))
        }
        (None, None) => read_stdin_text(MAX_SQL_INPUT_BYTES),
    }
}

/// Reads bounded query text from stdin.
fn read_stdin_text(max_bytes: usize) -> CliResult<String> {
    let read_limit = u64::try_from(max_bytes.saturating_add(1))
        .map_err(|_| CliError::new("query input size limit overflow".to_string()))?;
    let mut limited = std::io::stdin().take(read_limit);
    let mut bytes = Vec::new();
    limited
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::new(format!("failed to read stdin: {err}")))?;
    if bytes.len() > max_bytes {
        return Err(CliError::new(format!(
            "query input exceeds size limit ({} > {max_bytes})",
            bytes.len()
        )));
    }
    String::from_utf8(bytes).map_err(|_| CliError::new("query input must be utf-8".to_string()))
}

// ============================================================================
// SECTION: Policies Command
// ============================================================================

/// Executes the `policies` command.
fn command_policies(command: &PoliciesCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let catalog = config.column_catalog();
    let policies = catalog
        .scope_policies(&config.scoping.column)
        .map_err(|err| CliError::new(format!("failed to derive scope policies: {err}")))?;
    let handlers = config.handler_registry();

    if command.json {
        let report = PoliciesReport {
            scoping_column: &config.scoping.column,
            policies: policies.policies().collect(),
            handlers: handlers.entries().collect(),
        };
        let payload = serde_json::to_string(&report)
            .map_err(|err| CliError::new(format!("failed to encode policy output: {err}")))?;
        write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    } else {
        for line in render_policies_text(&config.scoping.column, &policies, &handlers) {
            write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders the effective policy listing in text form.
fn render_policies_text(
    column: &str,
    policies: &ScopePolicySet,
    handlers: &HandlerRegistry,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("scoping column: {column}"));
    lines.push(format!("scoped objects: {}", policies.len()));
    for policy in policies.policies() {
        let roles: Vec<&str> =
            policy.requires_scope_for.iter().map(|role| role.as_str()).collect();
        lines.push(format!(
            "  {} (column={}, scoped roles: {})",
            policy.object_id,
            policy.scoping_column,
            roles.join(", ")
        ));
    }
    lines.push(format!("object handlers: {}", handlers.len()));
    for (object_id, handler) in handlers.entries() {
        let detail = match handler {
            ObjectHandler::ScopedProcedure {
                parameter,
            } => format!("scoped_procedure parameter={parameter}"),
            ObjectHandler::CorrelationQuery {
                column,
            } => format!("correlation_query column={column}"),
        };
        lines.push(format!("  {object_id}: {detail}"));
    }
    lines
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => command_config_example(),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = RowgateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if config.dev.permit_missing_subject {
        write_stderr_line(&format!(
            "warning: dev.permit_missing_subject is enabled; missing subjects resolve to subject {}",
            config.dev.fallback_subject
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the canonical example configuration.
fn command_config_example() -> CliResult<ExitCode> {
    write_stdout_bytes(config_toml_example().as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Loads configuration with the implicit-default fallback.
fn load_config(path: Option<&Path>) -> CliResult<RowgateConfig> {
    RowgateConfig::load_or_default(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Splits a `NAME=VALUE` CLI parameter binding.
fn parse_bound_parameter(raw: &str) -> CliResult<(String, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(CliError::new(format!("invalid --param value {raw}: expected NAME=VALUE")));
    };
    if name.is_empty() {
        return Err(CliError::new(format!("invalid --param value {raw}: name must be non-empty")));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Failure modes for size-bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// Underlying I/O failure.
    Io(std::io::Error),
    /// File is larger than the enforced limit.
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Enforced limit in bytes.
        limit: usize,
    },
}

/// Reads a file into memory while enforcing a hard byte limit.
///
/// The metadata size check is advisory; the bounded read below it is the
/// actual enforcement, so a file growing mid-read still fails closed.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut reader = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let observed = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: observed,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Reports a fatal error on stderr and signals failure to the shell.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
