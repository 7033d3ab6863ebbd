// crates/hostlink-config/src/files.rs
// ============================================================================
// Module: On-Disk Configuration Formats
// Description: Serde models for the main config file and credentials file.
// Purpose: Parse local configuration sources into normalized host tables.
// Dependencies: serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Two local sources feed the credential store:
//! - the main configuration file (TOML) with `host` and `credentials` tables;
//! - the credentials file (JSON) written by an external login flow.
//!
//! Parsing is tolerant at the record level: a host key that fails
//! normalization is dropped and reported, the remaining records survive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::credentials::CredentialRecord;
use crate::hostname::Hostname;

// ============================================================================
// SECTION: Raw Models
// ============================================================================

/// Main configuration file contents.
#[derive(Debug, Default, Deserialize)]
struct MainConfigFile {
    /// Per-host service overrides keyed by raw hostname.
    #[serde(default)]
    host: BTreeMap<String, HostBlock>,
    /// Per-host credential records keyed by raw hostname.
    #[serde(default)]
    credentials: BTreeMap<String, BTreeMap<String, RawField>>,
}

/// A single `[host."name"]` block.
#[derive(Debug, Default, Deserialize)]
struct HostBlock {
    /// Service identifier to pinned URL.
    #[serde(default)]
    services: BTreeMap<String, String>,
}

/// Credentials file contents.
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    /// Per-host credential records keyed by raw hostname.
    #[serde(default)]
    credentials: BTreeMap<String, BTreeMap<String, RawField>>,
}

/// Scalar credential field as it appears on disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    /// String value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Nested or unsupported value; dropped.
    Other(IgnoredAny),
}

impl RawField {
    /// Returns the field rendered as a string, or `None` for nested values.
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value),
            Self::Bool(value) => Some(value.to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Other(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Parsed Output
// ============================================================================

/// Normalized tables parsed from one source.
#[derive(Debug)]
pub(crate) struct ParsedSource {
    /// Credential records keyed by normalized hostname.
    pub(crate) credentials: BTreeMap<Hostname, CredentialRecord>,
    /// Service overrides keyed by normalized hostname.
    pub(crate) host_services: BTreeMap<Hostname, BTreeMap<String, String>>,
    /// Record-level problems encountered while normalizing.
    pub(crate) warnings: Vec<String>,
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// Parses the TOML main configuration file.
pub(crate) fn parse_main_config(content: &str) -> Result<ParsedSource, String> {
    let raw: MainConfigFile = toml::from_str(content).map_err(|err| err.to_string())?;
    let mut warnings = Vec::new();
    let credentials = normalize_records(raw.credentials, &mut warnings);
    let mut host_services = BTreeMap::new();
    for (host, block) in raw.host {
        match Hostname::parse(&host) {
            Ok(hostname) => {
                host_services.insert(hostname, block.services);
            }
            Err(err) => warnings.push(format!("skipping host block: {err}")),
        }
    }
    Ok(ParsedSource {
        credentials,
        host_services,
        warnings,
    })
}

/// Parses the JSON credentials file.
pub(crate) fn parse_credentials_file(content: &str) -> Result<ParsedSource, String> {
    let raw: CredentialsFile = serde_json::from_str(content).map_err(|err| err.to_string())?;
    let mut warnings = Vec::new();
    let credentials = normalize_records(raw.credentials, &mut warnings);
    Ok(ParsedSource {
        credentials,
        host_services: BTreeMap::new(),
        warnings,
    })
}

/// Normalizes raw credential records, dropping invalid host keys.
fn normalize_records(
    raw: BTreeMap<String, BTreeMap<String, RawField>>,
    warnings: &mut Vec<String>,
) -> BTreeMap<Hostname, CredentialRecord> {
    let mut records = BTreeMap::new();
    for (host, fields) in raw {
        let hostname = match Hostname::parse(&host) {
            Ok(hostname) => hostname,
            Err(err) => {
                warnings.push(format!("skipping credentials record: {err}"));
                continue;
            }
        };
        let fields = fields
            .into_iter()
            .filter_map(|(name, value)| value.into_text().map(|text| (name, text)))
            .collect();
        records.insert(hostname, CredentialRecord::from_fields(fields));
    }
    records
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::parse_credentials_file;
    use super::parse_main_config;
    use crate::hostname::Hostname;

    #[test]
    fn main_config_yields_credentials_and_services() {
        let parsed = parse_main_config(
            r#"
[host."App.Example.com".services]
"api.v2" = "https://pinned.example.com/api/v2/"

[credentials."app.example.com"]
token = "main-token"
organization = "acme"
"#,
        )
        .unwrap();
        let host = Hostname::parse("app.example.com").unwrap();
        assert_eq!(parsed.credentials[&host].token(), Some("main-token"));
        assert_eq!(parsed.credentials[&host].get("organization"), Some("acme"));
        assert_eq!(
            parsed.host_services[&host].get("api.v2").map(String::as_str),
            Some("https://pinned.example.com/api/v2/")
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn invalid_host_keys_are_dropped_with_warning() {
        let parsed = parse_credentials_file(
            r#"{"credentials": {"https://bad/": {"token": "x"}, "ok.example.com": {"token": "y", "ttl": 30, "nested": {"a": 1}}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.credentials.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        let record = &parsed.credentials[&Hostname::parse("ok.example.com").unwrap()];
        assert_eq!(record.get("ttl"), Some("30"));
        assert_eq!(record.get("nested"), None);
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse_main_config("credentials = [").is_err());
        assert!(parse_credentials_file("{not json").is_err());
    }
}
