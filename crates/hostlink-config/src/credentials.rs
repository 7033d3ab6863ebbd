// crates/hostlink-config/src/credentials.rs
// ============================================================================
// Module: Credential Store
// Description: Best-effort loading and merging of local credential sources.
// Purpose: Produce per-host credential and service override tables.
// Dependencies: dirs, tracing
// ============================================================================

//! ## Overview
//! [`CredentialStore`] locates and parses the main configuration file and the
//! credentials file, then merges them into a [`CredentialTable`] plus a
//! [`HostServiceConfig`]. Loading never fails: unreadable or malformed sources
//! are logged, reported as [`LoadDiagnostic`] values, and treated as empty.
//! Invariants:
//! - When a host appears in both sources, the main configuration file's record
//!   replaces the credentials file's record in full.
//! - Host service overrides come only from the main configuration file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::env::CLI_CONFIG_FILE_ENV_VAR;
use crate::env::CONFIG_FILE_ENV_VAR;
use crate::env::Environment;
use crate::files::ParsedSource;
use crate::files::parse_credentials_file;
use crate::files::parse_main_config;
use crate::hostname::Hostname;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default main configuration file name, relative to the home directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".hostlinkrc";
/// Directory holding the credentials file, relative to the home directory.
pub const CREDENTIALS_DIR_NAME: &str = ".hostlink.d";
/// Credentials file name inside [`CREDENTIALS_DIR_NAME`].
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";
/// Maximum accepted size for a local configuration source, in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Credential field holding the bearer token.
pub const TOKEN_FIELD: &str = "token";

// ============================================================================
// SECTION: Credential Records
// ============================================================================

/// Authentication fields for a single host.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Field name to value.
    fields: BTreeMap<String, String>,
}

impl CredentialRecord {
    /// Creates a record from raw fields.
    #[must_use]
    pub const fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self {
            fields,
        }
    }

    /// Creates a record holding only a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(TOKEN_FIELD.to_string(), token.into());
        Self::from_fields(fields)
    }

    /// Returns the non-empty token field, if present.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_FIELD).filter(|token| !token.trim().is_empty())
    }

    /// Returns an arbitrary field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the field names carried by this record.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.keys().map(|name| (name, "<redacted>"))).finish()
    }
}

/// Credential records keyed by normalized hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialTable {
    /// Records keyed by normalized hostname.
    records: BTreeMap<Hostname, CredentialRecord>,
}

impl CredentialTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or wholesale replaces the record for `host`.
    pub fn insert(&mut self, host: Hostname, record: CredentialRecord) {
        self.records.insert(host, record);
    }

    /// Returns the record for `host`.
    #[must_use]
    pub fn get(&self, host: &Hostname) -> Option<&CredentialRecord> {
        self.records.get(host)
    }

    /// Returns the token stored for `host`.
    #[must_use]
    pub fn token_for(&self, host: &Hostname) -> Option<&str> {
        self.get(host).and_then(CredentialRecord::token)
    }

    /// Iterates records in hostname order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hostname, &CredentialRecord)> {
        self.records.iter()
    }

    /// Returns the number of hosts with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no host has a record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Overlays `other`, replacing whole records for every host it contains.
    fn overlay(&mut self, other: BTreeMap<Hostname, CredentialRecord>) {
        for (host, record) in other {
            self.records.insert(host, record);
        }
    }
}

/// Supplies bearer credentials for a host.
pub trait CredentialsSource: Send + Sync {
    /// Returns the token to present to `host`, if one is known.
    fn token_for_host(&self, host: &Hostname) -> Option<String>;
}

impl CredentialsSource for CredentialTable {
    fn token_for_host(&self, host: &Hostname) -> Option<String> {
        self.token_for(host).map(ToString::to_string)
    }
}

// ============================================================================
// SECTION: Host Service Overrides
// ============================================================================

/// Manually pinned service locations per host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostServiceConfig {
    /// Service identifier to URL, keyed by normalized hostname.
    hosts: BTreeMap<Hostname, BTreeMap<String, String>>,
}

impl HostServiceConfig {
    /// Creates an empty override table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the services for `host`, replacing any previous entry.
    pub fn insert(&mut self, host: Hostname, services: BTreeMap<String, String>) {
        self.hosts.insert(host, services);
    }

    /// Returns the pinned services for `host`.
    #[must_use]
    pub fn services_for(&self, host: &Hostname) -> Option<&BTreeMap<String, String>> {
        self.hosts.get(host)
    }

    /// Iterates overrides in hostname order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hostname, &BTreeMap<String, String>)> {
        self.hosts.iter()
    }

    /// Returns true when no host is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Local configuration source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Main configuration file.
    MainConfig,
    /// Credentials file written by the login flow.
    CredentialsFile,
}

impl SourceKind {
    /// Returns a stable label for the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MainConfig => "main_config",
            Self::CredentialsFile => "credentials_file",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory problem encountered while loading a local source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadDiagnostic {
    /// Source the problem belongs to.
    pub source: SourceKind,
    /// Path that was read.
    pub path: PathBuf,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.source, self.path.display(), self.message)
    }
}

/// Merged result of a credential load.
#[derive(Debug, Clone, Default)]
pub struct LoadedCredentials {
    /// Merged per-host credentials.
    pub credentials: CredentialTable,
    /// Per-host service overrides from the main configuration file.
    pub host_services: HostServiceConfig,
    /// Advisory problems; never fatal.
    pub diagnostics: Vec<LoadDiagnostic>,
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Locates and loads local credential sources.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    /// Environment consulted for path overrides.
    env: Environment,
    /// Home directory used for default paths.
    home: Option<PathBuf>,
}

impl CredentialStore {
    /// Creates a store rooted at the current user's home directory.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            home: dirs::home_dir(),
        }
    }

    /// Creates a store rooted at an explicit home directory.
    #[must_use]
    pub fn with_home(env: Environment, home: impl Into<PathBuf>) -> Self {
        Self {
            env,
            home: Some(home.into()),
        }
    }

    /// Returns the environment this store consults.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resolves the main configuration file path.
    ///
    /// The first non-empty of [`CLI_CONFIG_FILE_ENV_VAR`], [`CONFIG_FILE_ENV_VAR`]
    /// and `~/.hostlinkrc` wins.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> {
        self.env
            .get(CLI_CONFIG_FILE_ENV_VAR)
            .or_else(|| self.env.get(CONFIG_FILE_ENV_VAR))
            .map(PathBuf::from)
            .or_else(|| self.home.as_ref().map(|home| home.join(DEFAULT_CONFIG_FILE_NAME)))
    }

    /// Returns the fixed credentials file path.
    #[must_use]
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join(CREDENTIALS_DIR_NAME).join(CREDENTIALS_FILE_NAME))
    }

    /// Loads and merges both sources.
    #[must_use]
    pub fn load(&self) -> LoadedCredentials {
        let mut loaded = LoadedCredentials::default();

        let from_credentials_file = self.credentials_path().and_then(|path| {
            load_source(SourceKind::CredentialsFile, &path, parse_credentials_file, &mut loaded.diagnostics)
        });
        let from_main_config = self.config_path().and_then(|path| {
            load_source(SourceKind::MainConfig, &path, parse_main_config, &mut loaded.diagnostics)
        });

        if let Some(source) = from_credentials_file {
            loaded.credentials.overlay(source.credentials);
        }
        if let Some(source) = from_main_config {
            loaded.credentials.overlay(source.credentials);
            for (host, services) in source.host_services {
                loaded.host_services.insert(host, services);
            }
        }
        debug!(
            hosts = loaded.credentials.len(),
            diagnostics = loaded.diagnostics.len(),
            "loaded local credentials"
        );
        loaded
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and parses one source, recording any problem as a diagnostic.
fn load_source(
    kind: SourceKind,
    path: &Path,
    parse: fn(&str) -> Result<ParsedSource, String>,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> Option<ParsedSource> {
    let mut report = |message: String| {
        warn!(source = %kind, path = %path.display(), error = %message, "ignoring local config source");
        diagnostics.push(LoadDiagnostic {
            source: kind,
            path: path.to_path_buf(),
            message,
        });
    };

    let content = match read_limited(path) {
        Ok(Some(content)) => content,
        Ok(None) => {
            debug!(source = %kind, path = %path.display(), "local config source not present");
            return None;
        }
        Err(message) => {
            report(message);
            return None;
        }
    };
    match parse(&content) {
        Ok(parsed) => {
            for warning in &parsed.warnings {
                report(warning.clone());
            }
            Some(parsed)
        }
        Err(message) => {
            report(format!("parse error: {message}"));
            None
        }
    }
}

/// Reads a UTF-8 file under the size limit; `Ok(None)` when it does not exist.
fn read_limited(path: &Path) -> Result<Option<String>, String> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(format!("io error: {err}")),
    };
    if !metadata.is_file() {
        return Err("path is not a regular file".to_string());
    }
    if metadata.len() > MAX_CONFIG_FILE_SIZE as u64 {
        return Err("file exceeds size limit".to_string());
    }
    let bytes = fs::read(path).map_err(|err| format!("io error: {err}"))?;
    String::from_utf8(bytes).map(Some).map_err(|_| "file must be utf-8".to_string())
}
