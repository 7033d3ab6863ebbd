// crates/hostlink-client/src/client.rs
// ============================================================================
// Module: Host Client
// Description: Ready-to-use API client bound to one resolved configuration.
// Purpose: Carry the transport, service endpoint, and credentials together.
// Dependencies: hostlink-config, reqwest, url
// ============================================================================

//! ## Overview
//! A [`HostClient`] is built from a [`ClientConfiguration`] and is immutable
//! afterwards, so it can be shared through the client cache across threads.
//! Requests are addressed relative to the discovered service URL and always
//! carry the resolved bearer token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use hostlink_config::Hostname;
use reqwest::Method;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use url::Url;

use crate::discovery::DiscoveryContext;
use crate::fingerprint::Fingerprint;
use crate::resolver::ClientConfiguration;
use crate::transport::HttpTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Host Client
// ============================================================================

/// API client for a single host, token, and transport security setting.
///
/// # Invariants
/// - `fingerprint` matches `(token, hostname, insecure)` of the source configuration.
/// - Server-error retry is always enabled.
pub struct HostClient {
    /// Cache identity of this client.
    fingerprint: Fingerprint,
    /// Normalized target host.
    hostname: Hostname,
    /// Discovery outcome.
    discovery: DiscoveryContext,
    /// Bearer token.
    token: String,
    /// Configured transport.
    transport: HttpTransport,
    /// Whether a declared version constraint was evaluated.
    constraint_checked: bool,
    /// Whether server-side failures may be retried.
    retry_server_errors: bool,
}

impl HostClient {
    /// Builds a client from a resolved configuration.
    #[must_use]
    pub fn new(config: ClientConfiguration) -> Self {
        let fingerprint = config.fingerprint();
        Self {
            fingerprint,
            hostname: config.hostname,
            discovery: config.discovery,
            token: config.token,
            transport: config.transport,
            constraint_checked: config.constraint_checked,
            retry_server_errors: true,
        }
    }

    /// Returns the cache identity of this client.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the target host.
    #[must_use]
    pub const fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    /// Returns the discovered service URL.
    #[must_use]
    pub const fn service_url(&self) -> &Url {
        &self.discovery.service_url
    }

    /// Returns the selected service identifier.
    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.discovery.service_id
    }

    /// Returns the discovery outcome.
    #[must_use]
    pub const fn discovery(&self) -> &DiscoveryContext {
        &self.discovery
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns true when certificate verification is disabled.
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        self.transport.is_insecure()
    }

    /// Returns the configured transport.
    #[must_use]
    pub const fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Returns true when a declared version constraint was evaluated.
    #[must_use]
    pub const fn constraint_checked(&self) -> bool {
        self.constraint_checked
    }

    /// Returns true when server-side failures may be retried.
    #[must_use]
    pub const fn retry_server_errors(&self) -> bool {
        self.retry_server_errors
    }

    /// Starts an authenticated request to `path`, relative to the service URL.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when `path` cannot be joined to the service URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, url::ParseError> {
        let url = self.discovery.service_url.join(path)?;
        Ok(self.transport.client().request(method, url.as_str()).bearer_auth(&self.token))
    }

    /// Sends a request built by [`HostClient::request`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    pub fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        self.transport.send(request)
    }
}

impl fmt::Debug for HostClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClient")
            .field("fingerprint", &self.fingerprint)
            .field("hostname", &self.hostname)
            .field("service_url", &self.discovery.service_url.as_str())
            .field("token", &"<redacted>")
            .field("insecure", &self.transport.is_insecure())
            .finish()
    }
}
