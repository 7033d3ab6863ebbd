// crates/hostlink-config/src/lib.rs
// ============================================================================
// Module: Hostlink Config Library
// Description: Local configuration sources for Hostlink client bootstrap.
// Purpose: Single source of truth for hostnames, environment, and credentials.
// Dependencies: dirs, serde, serde_json, thiserror, toml, tracing, url
// ============================================================================

//! ## Overview
//! `hostlink-config` owns every locally sourced input to client bootstrap:
//! comparison-normalized [`Hostname`] values, the [`Environment`] variables
//! consulted during resolution, and the best-effort [`CredentialStore`] that
//! merges the main configuration file with the credentials file.
//!
//! Local sources are partially trusted: absent or malformed files degrade to
//! empty tables with [`LoadDiagnostic`] entries and never abort resolution.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod env;
mod files;
pub mod hostname;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::CredentialRecord;
pub use credentials::CredentialStore;
pub use credentials::CredentialTable;
pub use credentials::CredentialsSource;
pub use credentials::HostServiceConfig;
pub use credentials::LoadDiagnostic;
pub use credentials::LoadedCredentials;
pub use credentials::SourceKind;
pub use env::Environment;
pub use hostname::Hostname;
pub use hostname::HostnameError;
