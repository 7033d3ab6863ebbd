// crates/hostlink-client/src/transport.rs
// ============================================================================
// Module: HTTP Transport
// Description: TLS-configured blocking HTTP client with request instrumentation.
// Purpose: Single construction point for every outbound Hostlink request.
// Dependencies: reqwest, tracing, url
// ============================================================================

//! ## Overview
//! [`HttpTransport`] wraps a blocking `reqwest` client built with a TLS 1.2
//! floor, a fixed user agent, and a request timeout. Certificate verification
//! is disabled only when the transport is explicitly insecure. Every request
//! sent through [`HttpTransport::send`] is logged with method, URL, status and
//! latency; header values are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;
use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::tls;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Product token used in the user agent.
pub const USER_AGENT_PRODUCT: &str = "hostlink";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport construction and request failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Build(String),
    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Request URL.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// The response body exceeded the accepted size.
    #[error("response from {url} exceeds {max_bytes} bytes")]
    TooLarge {
        /// Request URL.
        url: String,
        /// Accepted size in bytes.
        max_bytes: usize,
    },
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Settings for building an [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Skip certificate verification.
    pub insecure: bool,
    /// Timeout applied to the full request lifecycle.
    pub timeout: Duration,
    /// Running client version embedded in the user agent.
    pub client_version: String,
}

impl TransportConfig {
    /// Returns the user agent string, e.g. `hostlink/0.1.0`.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("{USER_AGENT_PRODUCT}/{}", self.client_version)
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Instrumented HTTP transport.
///
/// # Invariants
/// - TLS versions below 1.2 are never negotiated.
/// - Certificate verification is disabled only when `insecure` is true.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Underlying blocking client.
    client: Client,
    /// Whether certificate verification is disabled.
    insecure: bool,
    /// User agent sent with every request.
    user_agent: String,
}

impl HttpTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when the TLS backend rejects the settings.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let user_agent = config.user_agent();
        if config.insecure {
            warn!("certificate verification disabled for hostlink transport");
        }
        let client = Client::builder()
            .min_tls_version(tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout)
            .user_agent(user_agent.clone())
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            client,
            insecure: config.insecure,
            user_agent,
        })
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Returns true when certificate verification is disabled.
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        self.insecure
    }

    /// Returns the user agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Starts a JSON GET request, attaching `token` as a bearer credential.
    #[must_use]
    pub fn get_json(&self, url: &Url, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.get(url.as_str()).header(ACCEPT, "application/json");
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request, logging its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] when the request cannot be built or sent.
    pub fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let request = builder.build().map_err(|err| TransportError::Request {
            url: err.url().map_or_else(String::new, ToString::to_string),
            reason: err.to_string(),
        })?;
        let method = request.method().clone();
        let url = request.url().clone();
        let started = Instant::now();
        let result = self.client.execute(request);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(response) => {
                debug!(
                    method = %method,
                    url = %url,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "hostlink request completed"
                );
                Ok(response)
            }
            Err(err) => {
                debug!(method = %method, url = %url, elapsed_ms, error = %err, "hostlink request failed");
                Err(TransportError::Request {
                    url: url.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body while enforcing a byte limit.
pub(crate) fn read_body_limited(response: Response, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let url = response.url().to_string();
    let too_large = || TransportError::TooLarge {
        url: url.clone(),
        max_bytes,
    };
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if response.content_length().is_some_and(|length| length > max_bytes_u64) {
        return Err(too_large());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Request {
            url: url.clone(),
            reason: err.to_string(),
        })?;
    if buf.len() > max_bytes {
        return Err(too_large());
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
