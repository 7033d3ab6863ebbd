// crates/hostlink-client/tests/connector.rs
// ============================================================================
// Module: Resolution and Cache Tests
// Description: Settings precedence, version gating, and client reuse.
// Purpose: Verify the full bootstrap path from settings to cached client.
// Dependencies: hostlink-client, hostlink-config, serde_json, tempfile, tiny_http
// ============================================================================

//! ## Overview
//! Resolves settings against temporary homes and fixed environments, then
//! builds clients through [`Connector`] against an in-process host.

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

mod common;

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use hostlink_client::Connector;
use hostlink_client::ExplicitSettings;
use hostlink_client::ResolveError;
use hostlink_client::ResolveErrorKind;
use hostlink_config::Environment;
use serde_json::json;
use tempfile::TempDir;

use crate::common::CONSTRAINT_PATH;
use crate::common::HostServer;
use crate::common::WELL_KNOWN;
use crate::common::resolver;
use crate::common::write_credentials;
use crate::common::write_main_config;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Explicit settings targeting `hostname` with `token`.
fn explicit(hostname: &str, token: Option<&str>) -> ExplicitSettings {
    ExplicitSettings {
        hostname: Some(hostname.to_string()),
        token: token.map(str::to_string),
        insecure: false,
    }
}

/// Starts a host advertising the API and a version constraint.
fn constrained_host(minimum: &str) -> HostServer {
    HostServer::start(vec![
        (WELL_KNOWN, 200, json!({"api.v2.1": "/api/v2.1/", "versions.v1": "/v1/versions/"})),
        (CONSTRAINT_PATH, 200, json!({"minimum": minimum})),
    ])
}

// ============================================================================
// SECTION: Settings Precedence
// ============================================================================

#[test]
fn explicit_token_wins_over_environment_and_files() {
    let home = TempDir::new().unwrap();
    write_credentials(home.path(), "app.example.com", "file-token");
    let env = Environment::with_overrides([("HOSTLINK_TOKEN", "env-token")]);
    let resolver = resolver(home.path(), env, "1.0.0");

    let settings = resolver.resolve_settings(&explicit("app.example.com", Some("explicit-token"))).unwrap();
    assert_eq!(settings.token, "explicit-token");
}

#[test]
fn environment_token_wins_over_files() {
    let home = TempDir::new().unwrap();
    write_credentials(home.path(), "app.example.com", "file-token");
    let env = Environment::with_overrides([("HOSTLINK_TOKEN", "env-token")]);
    let resolver = resolver(home.path(), env, "1.0.0");

    let settings = resolver.resolve_settings(&explicit("app.example.com", None)).unwrap();
    assert_eq!(settings.token, "env-token");
}

#[test]
fn file_token_is_matched_by_normalized_hostname() {
    let home = TempDir::new().unwrap();
    write_main_config(home.path(), "[credentials.\"app.example.com\"]\ntoken = \"main-token\"\n");
    let resolver = resolver(home.path(), Environment::empty(), "1.0.0");

    let settings = resolver.resolve_settings(&explicit("APP.Example.com.:443", None)).unwrap();
    assert_eq!(settings.hostname.as_str(), "app.example.com");
    assert_eq!(settings.token, "main-token");
}

#[test]
fn blank_explicit_values_fall_back() {
    let home = TempDir::new().unwrap();
    let env = Environment::with_overrides([("HOSTLINK_TOKEN", "env-token"), ("HOSTLINK_HOSTNAME", "env.example.com")]);
    let resolver = resolver(home.path(), env, "1.0.0");

    let settings = resolver
        .resolve_settings(&ExplicitSettings {
            hostname: Some("  ".to_string()),
            token: Some(String::new()),
            insecure: false,
        })
        .unwrap();
    assert_eq!(settings.hostname.as_str(), "env.example.com");
    assert_eq!(settings.token, "env-token");
}

#[test]
fn hostname_defaults_when_unset() {
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::with_overrides([("HOSTLINK_TOKEN", "t")]), "1.0.0");
    let settings = resolver.resolve_settings(&ExplicitSettings::default()).unwrap();
    assert_eq!(settings.hostname.as_str(), "app.hostlink.io");
}

#[test]
fn missing_token_names_every_source() {
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::empty(), "1.0.0");

    let err = resolver.resolve_settings(&explicit("app.example.com", None)).unwrap_err();
    assert_eq!(err.kind(), ResolveErrorKind::MissingAuthToken);
    let message = err.to_string();
    assert!(message.contains("app.example.com"), "{message}");
    assert!(message.contains("HOSTLINK_TOKEN"), "{message}");
    assert!(message.contains(".hostlink.d/credentials.json"), "{message}");
}

#[test]
fn invalid_hostname_is_reported() {
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::empty(), "1.0.0");
    let err = resolver.resolve_settings(&explicit("https://app.example.com/path", Some("t"))).unwrap_err();
    assert_eq!(err.kind(), ResolveErrorKind::InvalidHostname);
}

// ============================================================================
// SECTION: Insecure Flag
// ============================================================================

#[test]
fn environment_can_only_raise_insecure() {
    let home = TempDir::new().unwrap();

    let raised = resolver(
        home.path(),
        Environment::with_overrides([("HOSTLINK_TOKEN", "t"), ("HOSTLINK_SSL_SKIP_VERIFY", "true")]),
        "1.0.0",
    );
    assert!(raised.resolve_settings(&explicit("app.example.com", None)).unwrap().insecure);

    let not_lowered = resolver(
        home.path(),
        Environment::with_overrides([("HOSTLINK_TOKEN", "t"), ("HOSTLINK_SSL_SKIP_VERIFY", "false")]),
        "1.0.0",
    );
    let mut settings = explicit("app.example.com", None);
    settings.insecure = true;
    assert!(not_lowered.resolve_settings(&settings).unwrap().insecure);

    let garbage = resolver(
        home.path(),
        Environment::with_overrides([("HOSTLINK_TOKEN", "t"), ("HOSTLINK_SSL_SKIP_VERIFY", "sometimes")]),
        "1.0.0",
    );
    assert!(!garbage.resolve_settings(&explicit("app.example.com", None)).unwrap().insecure);
}

// ============================================================================
// SECTION: Client Construction
// ============================================================================

#[test]
fn connector_builds_client_for_discovered_service() {
    let server = HostServer::with_services(json!({"api.v2.1": "/api/v2.1/"}));
    let home = TempDir::new().unwrap();
    let connector = Connector::new(resolver(home.path(), Environment::empty(), "1.0.0"));

    let client = connector.client(&explicit(&server.hostname(), Some("tok"))).unwrap();
    assert_eq!(client.service_id(), "api.v2.1");
    assert_eq!(client.service_url().path(), "/api/v2.1/");
    assert_eq!(client.hostname().as_str(), server.hostname());
    assert_eq!(client.token(), "tok");
    assert!(client.retry_server_errors());
    assert!(!client.is_insecure());
    assert!(!format!("{client:?}").contains("tok\""));
}

#[test]
fn identical_settings_reuse_one_client() {
    let server = HostServer::with_services(json!({"api.v2": "/api/v2/"}));
    let home = TempDir::new().unwrap();
    let connector = Connector::new(resolver(home.path(), Environment::empty(), "1.0.0"));
    let settings = explicit(&server.hostname(), Some("tok"));

    let first = connector.client(&settings).unwrap();
    let second = connector.client(&settings).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.cache().len(), 1);
    assert_eq!(server.hits(WELL_KNOWN), 1);
}

#[test]
fn differing_token_or_insecure_yield_distinct_clients() {
    let server = HostServer::with_services(json!({"api.v2": "/api/v2/"}));
    let home = TempDir::new().unwrap();
    let connector = Connector::new(resolver(home.path(), Environment::empty(), "1.0.0"));

    let a = connector.client(&explicit(&server.hostname(), Some("tok-a"))).unwrap();
    let b = connector.client(&explicit(&server.hostname(), Some("tok-b"))).unwrap();
    let mut insecure = explicit(&server.hostname(), Some("tok-a"));
    insecure.insecure = true;
    let c = connector.client(&insecure).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert!(c.is_insecure());
    assert_eq!(connector.cache().len(), 3);
}

#[test]
fn concurrent_requests_construct_once() {
    let server = HostServer::with_services(json!({"api.v2": "/api/v2/"}));
    let home = TempDir::new().unwrap();
    let connector = Arc::new(Connector::new(resolver(home.path(), Environment::empty(), "1.0.0")));
    let settings = explicit(&server.hostname(), Some("tok"));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let connector = Arc::clone(&connector);
            let settings = settings.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                connector.client(&settings).unwrap()
            })
        })
        .collect();
    let clients: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert!(clients.iter().all(|client| Arc::ptr_eq(client, &clients[0])));
    assert_eq!(server.hits(WELL_KNOWN), 1);
    assert_eq!(connector.cache().len(), 1);
}

#[test]
fn discovery_failure_is_not_cached() {
    let server = HostServer::start(vec![(WELL_KNOWN, 404, json!({}))]);
    let home = TempDir::new().unwrap();
    let connector = Connector::new(resolver(home.path(), Environment::empty(), "1.0.0"));

    let err = connector.client(&explicit(&server.hostname(), Some("tok"))).unwrap_err();
    assert_eq!(err.kind(), ResolveErrorKind::DiscoveryFailed);
    assert!(connector.cache().is_empty());
}

// ============================================================================
// SECTION: Version Gating
// ============================================================================

#[test]
fn version_below_minimum_is_rejected_with_remediation() {
    let server = constrained_host("2.0.0");
    let home = TempDir::new().unwrap();
    let connector = Connector::new(resolver(home.path(), Environment::empty(), "1.0.0"));

    let err = connector.client(&explicit(&server.hostname(), Some("tok"))).unwrap_err();
    assert_eq!(err.kind(), ResolveErrorKind::ConstraintViolation);
    match &err {
        ResolveError::ConstraintViolation(violation) => {
            assert_eq!(violation.current, "1.0.0");
            assert_eq!(violation.summary, "upgrade to >= 2.0.0");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(connector.cache().is_empty());
}

#[test]
fn satisfied_constraint_is_recorded() {
    let server = constrained_host("0.9.0");
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::empty(), "1.0.0");

    let config = resolver.resolve(&explicit(&server.hostname(), Some("tok"))).unwrap();
    assert!(config.constraint_checked);
    assert_eq!(config.discovery.service_id, "api.v2.1");
}

#[test]
fn development_builds_skip_version_checks() {
    let server = constrained_host("99.0.0");
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::empty(), "dev");

    let config = resolver.resolve(&explicit(&server.hostname(), Some("tok"))).unwrap();
    assert!(!config.constraint_checked);
    assert!(config.discovery.constraint.is_some());
}

#[test]
fn unparsable_client_version_is_advisory() {
    let server = constrained_host("2.0.0");
    let home = TempDir::new().unwrap();
    let resolver = resolver(home.path(), Environment::empty(), "not-a-version");

    let config = resolver.resolve(&explicit(&server.hostname(), Some("tok"))).unwrap();
    assert!(!config.constraint_checked);
}
