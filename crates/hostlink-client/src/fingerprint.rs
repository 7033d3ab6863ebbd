// crates/hostlink-client/src/fingerprint.rs
// ============================================================================
// Module: Configuration Fingerprint
// Description: Stable digest of the inputs that identify a client.
// Purpose: Key the client cache without retaining raw tokens in key material.
// Dependencies: hostlink-config, serde, sha2
// ============================================================================

//! ## Overview
//! A [`Fingerprint`] is the lowercase hex SHA-256 digest of the token, the
//! normalized hostname, and the insecure flag. Each field is length-prefixed
//! so that no two distinct tuples share an encoding.
//!
//! Invariants:
//! - Equal `(token, hostname, insecure)` tuples always yield equal fingerprints.
//! - Differing tuples yield differing fingerprints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use hostlink_config::Hostname;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Domain separator mixed into every fingerprint.
const FINGERPRINT_DOMAIN: &[u8] = b"hostlink.client-fingerprint.v1";

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Cache identity of a resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a configuration tuple.
    #[must_use]
    pub fn new(token: &str, hostname: &Hostname, insecure: bool) -> Self {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, FINGERPRINT_DOMAIN);
        update_field(&mut hasher, token.as_bytes());
        update_field(&mut hasher, hostname.as_str().as_bytes());
        hasher.update([u8::from(insecure)]);
        Self(hex_encode(&hasher.finalize()))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Feeds a length-prefixed field into `hasher`.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
