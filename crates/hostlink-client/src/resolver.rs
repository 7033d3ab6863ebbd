// crates/hostlink-client/src/resolver.rs
// ============================================================================
// Module: Configuration Resolver
// Description: Precedence-based resolution of hostname, token, and transport.
// Purpose: Turn explicit settings plus local sources into a client configuration.
// Dependencies: hostlink-config, thiserror, tracing
// ============================================================================

//! ## Overview
//! Resolution runs in two phases. [`Resolver::resolve_settings`] reads only
//! local inputs (explicit settings, environment, credential files) and is
//! enough to fingerprint the configuration. [`Resolver::configure`] then
//! builds the transport, runs discovery, and checks version constraints.
//!
//! Precedence:
//! - hostname: explicit, then `HOSTLINK_HOSTNAME`, then the default host.
//! - token: explicit, then `HOSTLINK_TOKEN`, then the merged credential table.
//! - insecure: explicit `true` wins; otherwise `HOSTLINK_SSL_SKIP_VERIFY` may
//!   raise it to `true`. The environment can never lower it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use hostlink_config::CredentialStore;
use hostlink_config::Environment;
use hostlink_config::Hostname;
use hostlink_config::HostnameError;
use hostlink_config::LoadedCredentials;
use hostlink_config::env::HOSTNAME_ENV_VAR;
use hostlink_config::env::SSL_SKIP_VERIFY_ENV_VAR;
use hostlink_config::env::TOKEN_ENV_VAR;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::discovery::Discovery;
use crate::discovery::DiscoveryContext;
use crate::discovery::DiscoveryError;
use crate::discovery::DiscoveryOptions;
use crate::fingerprint::Fingerprint;
use crate::transport::DEFAULT_REQUEST_TIMEOUT;
use crate::transport::HttpTransport;
use crate::transport::TransportConfig;
use crate::transport::TransportError;
use crate::version::ConstraintViolation;
use crate::version::DEV_VERSION;
use crate::version::VersionCheckError;
use crate::version::check_constraints;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Host used when neither an explicit nor an environment hostname is set.
pub const DEFAULT_HOSTNAME: &str = "app.hostlink.io";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resolution failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No token is available from any source.
    #[error(
        "no token found for host {hostname}: pass a token explicitly, set HOSTLINK_TOKEN, or add a \
         credentials entry for the host to ~/.hostlinkrc or ~/.hostlink.d/credentials.json"
    )]
    MissingAuthToken {
        /// Host the token was required for.
        hostname: Hostname,
    },
    /// The hostname cannot be normalized.
    #[error(transparent)]
    InvalidHostname(#[from] HostnameError),
    /// The transport could not be built.
    #[error("failed to configure transport: {0}")]
    Transport(#[from] TransportError),
    /// Discovery failed.
    #[error("failed to discover host services: {0}")]
    DiscoveryFailed(#[from] DiscoveryError),
    /// The running client version is not accepted by the host.
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),
}

/// Stable category of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveErrorKind {
    /// No token is available.
    MissingAuthToken,
    /// Hostname is invalid.
    InvalidHostname,
    /// Discovery or transport setup failed.
    DiscoveryFailed,
    /// Client version rejected by the host.
    ConstraintViolation,
}

impl ResolveErrorKind {
    /// Returns a stable label for logs and machine-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAuthToken => "missing_auth_token",
            Self::InvalidHostname => "invalid_hostname",
            Self::DiscoveryFailed => "discovery_failed",
            Self::ConstraintViolation => "constraint_violation",
        }
    }
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolveError {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ResolveErrorKind {
        match self {
            Self::MissingAuthToken {
                ..
            } => ResolveErrorKind::MissingAuthToken,
            Self::InvalidHostname(_) => ResolveErrorKind::InvalidHostname,
            Self::Transport(_) | Self::DiscoveryFailed(_) => ResolveErrorKind::DiscoveryFailed,
            Self::ConstraintViolation(_) => ResolveErrorKind::ConstraintViolation,
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Caller-supplied settings; unset fields fall back to other sources.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExplicitSettings {
    /// Target host.
    pub hostname: Option<String>,
    /// Authentication token.
    pub token: Option<String>,
    /// Skip certificate verification.
    pub insecure: bool,
}

impl fmt::Debug for ExplicitSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitSettings")
            .field("hostname", &self.hostname)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// Locally resolved settings, before any network access.
pub struct ResolvedSettings {
    /// Normalized target host.
    pub hostname: Hostname,
    /// Resolved token.
    pub token: String,
    /// Effective insecure flag.
    pub insecure: bool,
    /// Local sources loaded for this resolution.
    pub local: LoadedCredentials,
}

impl ResolvedSettings {
    /// Returns the cache identity of these settings.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.token, &self.hostname, self.insecure)
    }
}

impl fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSettings")
            .field("hostname", &self.hostname)
            .field("token", &"<redacted>")
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

/// Everything needed to construct a host client.
pub struct ClientConfiguration {
    /// Discovery outcome.
    pub discovery: DiscoveryContext,
    /// Configured transport.
    pub transport: HttpTransport,
    /// Normalized target host.
    pub hostname: Hostname,
    /// Resolved token.
    pub token: String,
    /// Effective insecure flag.
    pub insecure: bool,
    /// Whether a declared version constraint was evaluated.
    pub constraint_checked: bool,
}

impl ClientConfiguration {
    /// Returns the cache identity of this configuration.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.token, &self.hostname, self.insecure)
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("discovery", &self.discovery)
            .field("hostname", &self.hostname)
            .field("token", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("constraint_checked", &self.constraint_checked)
            .finish_non_exhaustive()
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Running client version; `dev` skips constraint checks.
    pub client_version: String,
    /// Request timeout for discovery and API traffic.
    pub timeout: Duration,
    /// Discovery options.
    pub discovery: DiscoveryOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            discovery: DiscoveryOptions::default(),
        }
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves client configurations from explicit settings and local sources.
#[derive(Debug)]
pub struct Resolver {
    /// Local configuration sources.
    store: CredentialStore,
    /// Resolver tuning.
    options: ResolverOptions,
    /// Discovery with its document cache.
    discovery: Discovery,
}

impl Resolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: CredentialStore, options: ResolverOptions) -> Self {
        let discovery = Discovery::new(options.discovery);
        Self {
            store,
            options,
            discovery,
        }
    }

    /// Creates a resolver over the process environment and home directory.
    #[must_use]
    pub fn from_process() -> Self {
        Self::new(CredentialStore::new(Environment::process()), ResolverOptions::default())
    }

    /// Returns the local configuration store.
    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the resolver options.
    #[must_use]
    pub const fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Returns the discovery instance.
    #[must_use]
    pub const fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Resolves hostname, token, and insecure flag from local sources only.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidHostname`] or [`ResolveError::MissingAuthToken`].
    pub fn resolve_settings(&self, explicit: &ExplicitSettings) -> Result<ResolvedSettings, ResolveError> {
        let env = self.store.environment();
        let raw_hostname = non_empty(explicit.hostname.as_deref())
            .map(str::to_string)
            .or_else(|| env.get(HOSTNAME_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let hostname = Hostname::parse(&raw_hostname)?;
        let insecure = explicit.insecure || env.get_bool(SSL_SKIP_VERIFY_ENV_VAR).unwrap_or(false);

        let local = self.store.load();
        let token = non_empty(explicit.token.as_deref())
            .map(str::to_string)
            .or_else(|| env.get(TOKEN_ENV_VAR))
            .or_else(|| local.credentials.token_for(&hostname).map(str::to_string))
            .ok_or_else(|| ResolveError::MissingAuthToken {
                hostname: hostname.clone(),
            })?;

        debug!(host = %hostname, insecure, "resolved hostlink settings");
        Ok(ResolvedSettings {
            hostname,
            token,
            insecure,
            local,
        })
    }

    /// Builds the transport, runs discovery, and checks version constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the transport cannot be built, discovery
    /// fails, or the host rejects the running client version.
    pub fn configure(&self, settings: ResolvedSettings) -> Result<ClientConfiguration, ResolveError> {
        let transport = HttpTransport::new(&TransportConfig {
            insecure: settings.insecure,
            timeout: self.options.timeout,
            client_version: self.options.client_version.clone(),
        })?;
        let discovery = self.discovery.discover(
            &transport,
            &settings.hostname,
            &settings.local.credentials,
            &settings.local.host_services,
        )?;
        let constraint_checked = self.check_version(&settings.hostname, &discovery)?;
        Ok(ClientConfiguration {
            discovery,
            transport,
            hostname: settings.hostname,
            token: settings.token,
            insecure: settings.insecure,
            constraint_checked,
        })
    }

    /// Resolves a full client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] from either resolution phase.
    pub fn resolve(&self, explicit: &ExplicitSettings) -> Result<ClientConfiguration, ResolveError> {
        let settings = self.resolve_settings(explicit)?;
        self.configure(settings)
    }

    /// Checks the declared constraint, returning whether one was evaluated.
    fn check_version(&self, host: &Hostname, discovery: &DiscoveryContext) -> Result<bool, ResolveError> {
        let version = self.options.client_version.as_str();
        if version == DEV_VERSION {
            debug!(host = %host, "development build; skipping version constraint check");
            return Ok(false);
        }
        let Some(constraint) = &discovery.constraint else {
            return Ok(false);
        };
        match check_constraints(constraint, version) {
            Ok(()) => Ok(true),
            Err(VersionCheckError::Violation(violation)) => Err(violation.into()),
            Err(VersionCheckError::Unexpected(reason)) => {
                warn!(host = %host, version, reason = %reason, "ignoring unverifiable version constraint");
                Ok(false)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns `value` unless it is absent or blank.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
