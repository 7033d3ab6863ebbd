// crates/hostlink-config/src/env.rs
// ============================================================================
// Module: Environment Lookup
// Description: Process environment access with deterministic overrides.
// Purpose: Centralize the environment variables consulted during resolution.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`Environment`] reads the process environment, or a fixed override map
//! when one is supplied. Empty values are treated as unset so that an
//! exported-but-blank variable never shadows a lower-precedence source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::warn;

// ============================================================================
// SECTION: Variable Names
// ============================================================================

/// Explicit authentication token.
pub const TOKEN_ENV_VAR: &str = "HOSTLINK_TOKEN";
/// Explicit service hostname.
pub const HOSTNAME_ENV_VAR: &str = "HOSTLINK_HOSTNAME";
/// Insecure override; may only raise `insecure` from false to true.
pub const SSL_SKIP_VERIFY_ENV_VAR: &str = "HOSTLINK_SSL_SKIP_VERIFY";
/// Main configuration file path override.
pub const CLI_CONFIG_FILE_ENV_VAR: &str = "HOSTLINK_CLI_CONFIG_FILE";
/// Secondary main configuration file path override.
pub const CONFIG_FILE_ENV_VAR: &str = "HOSTLINK_CONFIG_FILE";

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Source of environment variable values.
///
/// # Invariants
/// - When `overrides` is set, the process environment is never read.
/// - Empty values are reported as absent.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Optional override map used for deterministic lookups.
    overrides: Option<BTreeMap<String, String>>,
}

impl Environment {
    /// Returns an environment backed by the running process.
    #[must_use]
    pub const fn process() -> Self {
        Self {
            overrides: None,
        }
    }

    /// Returns an environment with no variables set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            overrides: Some(BTreeMap::new()),
        }
    }

    /// Returns an environment that only sees the provided variables.
    #[must_use]
    pub fn with_overrides<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: Some(vars.into_iter().map(|(key, value)| (key.into(), value.into())).collect()),
        }
    }

    /// Returns the non-empty value of `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(overrides) => overrides.get(key).cloned(),
            None => std::env::var(key).ok(),
        }?;
        if value.trim().is_empty() { None } else { Some(value) }
    }

    /// Returns the boolean value of `key`, ignoring unparsable values.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        let parsed = parse_bool(&raw);
        if parsed.is_none() {
            warn!(variable = key, value = %raw, "ignoring non-boolean environment value");
        }
        parsed
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the boolean spellings accepted for environment flags.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
