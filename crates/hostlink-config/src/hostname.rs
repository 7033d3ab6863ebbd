// crates/hostlink-config/src/hostname.rs
// ============================================================================
// Module: Hostname Normalization
// Description: Comparison-normalized hostnames for credential and cache keys.
// Purpose: Guarantee that equivalent host spellings compare equal.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! A [`Hostname`] is the comparison form of a user-supplied host: trimmed,
//! lowercased, IDNA-encoded, without a trailing dot and without the default
//! HTTPS port. Every credential table key and every cache fingerprint is
//! computed from this form, never from raw input.
//! Invariants:
//! - A constructed [`Hostname`] is always in normalized form.
//! - Port `443` is dropped; any other explicit port is preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use url::Host;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Port implied by the `https` scheme; dropped during normalization.
const DEFAULT_HTTPS_PORT: u16 = 443;
/// Maximum length of a single DNS label.
const MAX_LABEL_LENGTH: usize = 63;
/// Maximum length of a full domain name.
const MAX_DOMAIN_LENGTH: usize = 253;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when a hostname cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostnameError {
    /// Hostname input was empty after trimming.
    #[error("hostname must be non-empty")]
    Empty,
    /// Hostname input could not be normalized.
    #[error("invalid hostname '{host}': {reason}")]
    Invalid {
        /// Raw hostname input.
        host: String,
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl HostnameError {
    /// Builds an [`HostnameError::Invalid`] for the given raw input.
    fn invalid(host: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Hostname
// ============================================================================

/// Hostname in comparison-normalized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hostname(String);

impl Hostname {
    /// Normalizes raw hostname input.
    ///
    /// # Errors
    ///
    /// Returns [`HostnameError`] when the input is empty, carries a scheme,
    /// path or credentials, or contains an invalid host or port.
    pub fn parse(raw: &str) -> Result<Self, HostnameError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HostnameError::Empty);
        }
        if trimmed.contains("://") {
            return Err(HostnameError::invalid(raw, "hostname must not include a scheme"));
        }
        if trimmed.contains(['/', '?', '#', '@', '\\']) {
            return Err(HostnameError::invalid(raw, "hostname must not include a path or userinfo"));
        }

        let (host_part, port) = split_port(raw, trimmed)?;
        let host_part = host_part.strip_suffix('.').unwrap_or(host_part);
        if host_part.is_empty() {
            return Err(HostnameError::Empty);
        }

        let host = Host::parse(host_part).map_err(|err| HostnameError::invalid(raw, err.to_string()))?;
        let mut normalized = match host {
            Host::Domain(domain) => {
                validate_domain(raw, &domain)?;
                domain
            }
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => format!("[{ip}]"),
        };
        if let Some(port) = port
            && port != DEFAULT_HTTPS_PORT
        {
            normalized.push(':');
            normalized.push_str(&port.to_string());
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized hostname string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Hostname {
    type Err = HostnameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Hostname {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits an optional `:port` suffix from the host portion.
fn split_port<'a>(raw: &str, value: &'a str) -> Result<(&'a str, Option<u16>), HostnameError> {
    if value.starts_with('[') {
        let end = value
            .find(']')
            .ok_or_else(|| HostnameError::invalid(raw, "unterminated IPv6 literal"))?;
        let (host, rest) = value.split_at(end + 1);
        if rest.is_empty() {
            return Ok((host, None));
        }
        let port = rest
            .strip_prefix(':')
            .ok_or_else(|| HostnameError::invalid(raw, "unexpected text after IPv6 literal"))?;
        return Ok((host, Some(parse_port(raw, port)?)));
    }
    match value.matches(':').count() {
        0 => Ok((value, None)),
        1 => {
            let (host, port) = value.split_once(':').unwrap_or((value, ""));
            Ok((host, Some(parse_port(raw, port)?)))
        }
        _ => Err(HostnameError::invalid(raw, "IPv6 literals must be enclosed in brackets")),
    }
}

/// Parses a non-zero TCP port.
fn parse_port(raw: &str, port: &str) -> Result<u16, HostnameError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(HostnameError::invalid(raw, format!("invalid port '{port}'"))),
        Ok(port) => Ok(port),
    }
}

/// Validates DNS label structure for an IDNA-encoded domain.
fn validate_domain(raw: &str, domain: &str) -> Result<(), HostnameError> {
    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(HostnameError::invalid(raw, "hostname exceeds max length"));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(HostnameError::invalid(raw, "hostname contains an empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(HostnameError::invalid(raw, "hostname label exceeds max length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::invalid(raw, "hostname label must not start or end with '-'"));
        }
        if !label.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-') {
            return Err(HostnameError::invalid(raw, "hostname contains invalid characters"));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
