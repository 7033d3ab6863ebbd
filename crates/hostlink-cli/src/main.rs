// crates/hostlink-cli/src/main.rs
// ============================================================================
// Module: Hostlink CLI Entry Point
// Description: Command dispatcher for client resolution and credential inspection.
// Purpose: Expose the bootstrap pipeline for diagnostics and scripting.
// Dependencies: clap, hostlink-client, hostlink-config, serde, thiserror, tracing-subscriber.
// ============================================================================

//! ## Overview
//! `hostlink resolve` runs the full bootstrap pipeline and prints the chosen
//! endpoint as JSON. `hostlink credentials` prints what the local sources
//! provide, with every token redacted. Logs go to stderr and are filtered by
//! `RUST_LOG`.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use hostlink_client::Connector;
use hostlink_client::DiscoveryOptions;
use hostlink_client::ExplicitSettings;
use hostlink_client::HostClient;
use hostlink_client::ResolveError;
use hostlink_client::Resolver;
use hostlink_client::ResolverOptions;
use hostlink_config::CredentialStore;
use hostlink_config::Environment;
use hostlink_config::LoadDiagnostic;
use hostlink_config::LoadedCredentials;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "hostlink", version, disable_help_subcommand = true)]
struct Cli {
    /// Request timeout for discovery and constraint lookups, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TIMEOUT_MS, global = true)]
    timeout_ms: u64,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a client configuration and print the selected endpoint.
    Resolve(ResolveCommand),
    /// Print locally configured credentials with tokens redacted.
    Credentials,
}

/// Arguments for `hostlink resolve`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct ResolveCommand {
    /// Target host; defaults to `HOSTLINK_HOSTNAME` or the public host.
    #[arg(long, value_name = "HOST")]
    hostname: Option<String>,
    /// Authentication token; defaults to `HOSTLINK_TOKEN` or local credentials.
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,
    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,
    /// Discover over plain HTTP (local development hosts only).
    #[arg(long, hide = true)]
    allow_http: bool,
}

impl ResolveCommand {
    /// Converts the arguments into resolver input.
    fn explicit_settings(&self) -> ExplicitSettings {
        ExplicitSettings {
            hostname: self.hostname.clone(),
            token: self.token.clone(),
            insecure: self.insecure,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures reported on stderr.
#[derive(Debug, Error)]
enum CliError {
    /// Client resolution failed.
    #[error("{kind}: {source}")]
    Resolve {
        /// Stable error category.
        kind: String,
        /// Underlying resolution error.
        source: ResolveError,
    },
    /// Output could not be encoded.
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<ResolveError> for CliError {
    fn from(source: ResolveError) -> Self {
        Self::Resolve {
            kind: source.kind().to_string(),
            source,
        }
    }
}

/// Result type for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// JSON output of `hostlink resolve`.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct ResolveReport {
    /// Normalized host.
    hostname: String,
    /// Selected service identifier.
    service_id: String,
    /// Discovered service URL.
    service_url: String,
    /// Effective insecure flag.
    insecure: bool,
    /// Configuration fingerprint.
    fingerprint: String,
    /// Whether a declared version constraint was evaluated.
    constraint_checked: bool,
}

impl ResolveReport {
    /// Summarizes a constructed client.
    fn from_client(client: &HostClient) -> Self {
        Self {
            hostname: client.hostname().to_string(),
            service_id: client.service_id().to_string(),
            service_url: client.service_url().to_string(),
            insecure: client.is_insecure(),
            fingerprint: client.fingerprint().to_string(),
            constraint_checked: client.constraint_checked(),
        }
    }
}

/// One host entry in the credentials report.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct CredentialSummary {
    /// Normalized host.
    hostname: String,
    /// Whether a non-empty token is present.
    has_token: bool,
    /// Field names of the record; values are never shown.
    fields: Vec<String>,
}

/// JSON output of `hostlink credentials`.
#[derive(Debug, Serialize)]
struct CredentialsReport {
    /// Main configuration file path.
    config_path: Option<String>,
    /// Credentials file path.
    credentials_path: Option<String>,
    /// Hosts with credentials.
    credentials: Vec<CredentialSummary>,
    /// Per-host service overrides.
    host_services: BTreeMap<String, BTreeMap<String, String>>,
    /// Advisory load problems.
    diagnostics: Vec<LoadDiagnostic>,
}

impl CredentialsReport {
    /// Builds the report from a store and its loaded sources.
    fn new(store: &CredentialStore, loaded: LoadedCredentials) -> Self {
        let credentials = loaded
            .credentials
            .iter()
            .map(|(host, record)| CredentialSummary {
                hostname: host.to_string(),
                has_token: record.token().is_some(),
                fields: record.field_names().map(str::to_string).collect(),
            })
            .collect();
        let host_services =
            loaded.host_services.iter().map(|(host, services)| (host.to_string(), services.clone())).collect();
        Self {
            config_path: store.config_path().map(|path| path.display().to_string()),
            credentials_path: store.credentials_path().map(|path| path.display().to_string()),
            credentials,
            host_services,
            diagnostics: loaded.diagnostics,
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the selected command.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let timeout = Duration::from_millis(cli.timeout_ms);
    match cli.command {
        Commands::Resolve(command) => command_resolve(&command, timeout),
        Commands::Credentials => command_credentials(),
    }
}

/// Installs the stderr log subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs `hostlink resolve`.
fn command_resolve(command: &ResolveCommand, timeout: Duration) -> CliResult<ExitCode> {
    let options = ResolverOptions {
        timeout,
        discovery: DiscoveryOptions {
            allow_http: command.allow_http,
        },
        ..ResolverOptions::default()
    };
    let resolver = Resolver::new(CredentialStore::new(Environment::process()), options);
    let connector = Connector::new(resolver);
    let client = connector.client(&command.explicit_settings())?;
    write_json(&ResolveReport::from_client(&client))?;
    Ok(ExitCode::SUCCESS)
}

/// Runs `hostlink credentials`.
fn command_credentials() -> CliResult<ExitCode> {
    let store = CredentialStore::new(Environment::process());
    let loaded = store.load();
    write_json(&CredentialsReport::new(&store, loaded))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as pretty JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    write_stdout_line(&rendered)?;
    Ok(())
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
