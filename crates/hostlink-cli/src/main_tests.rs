// crates/hostlink-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and report rendering.
// Purpose: Ensure flags map onto resolver input and tokens never reach output.
// Dependencies: hostlink-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates clap wiring, error rendering, and the redaction of the
//! credentials report.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use hostlink_client::ResolveError;
use hostlink_config::CredentialStore;
use hostlink_config::Environment;
use hostlink_config::Hostname;
use tempfile::TempDir;

use super::Cli;
use super::CliError;
use super::Commands;
use super::CredentialsReport;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn resolve_flags_map_to_explicit_settings() {
    let cli = Cli::try_parse_from([
        "hostlink",
        "resolve",
        "--hostname",
        "app.example.com",
        "--token",
        "secret",
        "--insecure",
    ])
    .unwrap();
    let Commands::Resolve(command) = cli.command else {
        panic!("expected resolve command");
    };
    let settings = command.explicit_settings();
    assert_eq!(settings.hostname.as_deref(), Some("app.example.com"));
    assert_eq!(settings.token.as_deref(), Some("secret"));
    assert!(settings.insecure);
    assert!(!command.allow_http);
}

#[test]
fn timeout_is_global_and_defaults() {
    let cli = Cli::try_parse_from(["hostlink", "credentials"]).unwrap();
    assert_eq!(cli.timeout_ms, 10_000);

    let cli = Cli::try_parse_from(["hostlink", "resolve", "--timeout-ms", "250"]).unwrap();
    assert_eq!(cli.timeout_ms, 250);
}

#[test]
fn resolve_errors_are_prefixed_with_their_kind() {
    let err = CliError::from(ResolveError::MissingAuthToken {
        hostname: Hostname::parse("app.example.com").unwrap(),
    });
    let message = err.to_string();
    assert!(message.starts_with("missing_auth_token: "), "{message}");
    assert!(message.contains("HOSTLINK_TOKEN"), "{message}");
}

#[test]
fn credentials_report_redacts_tokens() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".hostlink.d");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("credentials.json"),
        r#"{"credentials": {"app.example.com": {"token": "top-secret", "organization": "acme"}}}"#,
    )
    .unwrap();
    fs::write(
        home.path().join(".hostlinkrc"),
        "[host.\"app.example.com\".services]\n\"api.v2\" = \"https://pinned.example.com/\"\n",
    )
    .unwrap();

    let store = CredentialStore::with_home(Environment::empty(), home.path());
    let report = CredentialsReport::new(&store, store.load());
    let rendered = serde_json::to_string(&report).unwrap();

    assert!(!rendered.contains("top-secret"));
    assert_eq!(report.credentials.len(), 1);
    assert!(report.credentials[0].has_token);
    assert_eq!(report.credentials[0].fields, vec!["organization".to_string(), "token".to_string()]);
    assert_eq!(report.host_services["app.example.com"]["api.v2"], "https://pinned.example.com/");
    assert!(report.diagnostics.is_empty());
}
