// crates/hostlink-client/src/discovery.rs
// ============================================================================
// Module: Host Discovery
// Description: Well-known service discovery and version-constraint lookup.
// Purpose: Map a hostname to the best supported API endpoint.
// Dependencies: hostlink-config, reqwest, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! [`Discovery`] fetches `/.well-known/hostlink.json` from a host (or uses a
//! local services override without any network access), then walks the
//! supported API service identifiers newest first. Only a
//! [`ServiceError::VersionNotSupported`] outcome falls through to the next
//! identifier; any other failure aborts discovery.
//!
//! Once a service is selected, the host's `versions.v1` service (when
//! advertised) is asked for the client version constraint. That lookup is
//! advisory: every failure is logged and treated as "no constraint".
//!
//! Security posture: discovery documents are remote, untrusted input. Bodies
//! are size-limited and service URLs must use HTTP(S).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use hostlink_config::CredentialsSource;
use hostlink_config::HostServiceConfig;
use hostlink_config::Hostname;
use reqwest::StatusCode;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::transport::HttpTransport;
use crate::transport::TransportError;
use crate::transport::read_body_limited;
use crate::version::VersionConstraint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path of the discovery document on every host.
pub const WELL_KNOWN_PATH: &str = "/.well-known/hostlink.json";
/// Supported API service identifiers, most preferred first.
pub const API_SERVICE_IDS: [&str; 3] = ["api.v2.2", "api.v2.1", "api.v2"];
/// Service identifier of the version-constraint service.
pub const VERSIONS_SERVICE_ID: &str = "versions.v1";
/// Product name sent to the version-constraint service.
pub const PRODUCT_NAME: &str = "hostlink-client";
/// Maximum accepted size of discovery and constraint documents.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Service Identifiers
// ============================================================================

/// Parsed `<name>.v<version>` service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId {
    /// Service name, e.g. `api`.
    name: String,
    /// Version suffix, e.g. `v2.1`.
    version: String,
}

impl ServiceId {
    /// Parses a service identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Malformed`] when the identifier lacks a
    /// `.v<digits>` version suffix.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let malformed = |reason: &str| ServiceError::Malformed {
            service: raw.to_string(),
            reason: reason.to_string(),
        };
        let (name, version) = raw.split_once('.').ok_or_else(|| malformed("missing version suffix"))?;
        if name.is_empty() {
            return Err(malformed("empty service name"));
        }
        let digits = version.strip_prefix('v').ok_or_else(|| malformed("version must start with 'v'"))?;
        let numeric = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
        if !digits.split('.').all(numeric) {
            return Err(malformed("version must be dot-separated digits"));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the version suffix including the leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.version)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Outcome of looking up one service in a discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The host offers the service, but not at the requested version.
    #[error("host does not support {requested}; supported versions: {}", supported.join(", "))]
    VersionNotSupported {
        /// Requested service identifier.
        requested: String,
        /// Identifiers of the same service the host does offer.
        supported: Vec<String>,
    },
    /// The host does not offer the service at all.
    #[error("host does not provide service {service}")]
    NotProvided {
        /// Requested service identifier.
        service: String,
    },
    /// The identifier or its advertised URL is malformed.
    #[error("service {service} is malformed: {reason}")]
    Malformed {
        /// Service identifier.
        service: String,
        /// Failure description.
        reason: String,
    },
}

impl ServiceError {
    /// Returns true when discovery may try the next service identifier.
    #[must_use]
    pub const fn is_version_not_supported(&self) -> bool {
        matches!(self, Self::VersionNotSupported { .. })
    }
}

/// Fatal discovery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The discovery URL could not be formed for the host.
    #[error("cannot form discovery url for {host}: {reason}")]
    InvalidUrl {
        /// Target host.
        host: String,
        /// Failure description.
        reason: String,
    },
    /// The discovery request failed.
    #[error("failed to request discovery document: {0}")]
    Transport(#[from] TransportError),
    /// The host answered with a non-success status.
    #[error("discovery request to {url} returned status {status}")]
    Status {
        /// Discovery URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The discovery document is not a JSON object.
    #[error("invalid discovery document from {url}: {reason}")]
    InvalidDocument {
        /// Discovery URL.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// A service lookup failed with a non-fallthrough error.
    #[error("service lookup failed: {0}")]
    Service(#[from] ServiceError),
    /// Every supported service identifier was rejected as unsupported.
    #[error("host {host} supports none of the client's API versions ({})", tried.join(", "))]
    NoSupportedService {
        /// Target host.
        host: String,
        /// Identifiers tried, in order.
        tried: Vec<String>,
    },
}

// ============================================================================
// SECTION: Discovery Document
// ============================================================================

/// Service map advertised by a host.
///
/// # Invariants
/// - Relative service URLs resolve against `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryDocument {
    /// URL the document was retrieved from, after redirects.
    base: Url,
    /// Raw service entries keyed by service identifier.
    services: Map<String, Value>,
}

impl DiscoveryDocument {
    /// Parses a document body retrieved from `base`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidDocument`] when the body is not a JSON object.
    pub fn parse(base: Url, body: &[u8]) -> Result<Self, DiscoveryError> {
        let invalid = |reason: String| DiscoveryError::InvalidDocument {
            url: base.to_string(),
            reason,
        };
        let value: Value = serde_json::from_slice(body).map_err(|err| invalid(err.to_string()))?;
        let Value::Object(services) = value else {
            return Err(invalid("document must be a JSON object".to_string()));
        };
        Ok(Self {
            base,
            services,
        })
    }

    /// Builds a document from a local services override.
    #[must_use]
    pub fn from_services(base: Url, services: &BTreeMap<String, String>) -> Self {
        let services = services.iter().map(|(id, url)| (id.clone(), Value::String(url.clone()))).collect();
        Self {
            base,
            services,
        }
    }

    /// Returns the base URL used for relative service URLs.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the advertised service identifiers.
    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Resolves the URL of service `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::VersionNotSupported`] when only other versions of
    /// the service are advertised, [`ServiceError::NotProvided`] when none are,
    /// and [`ServiceError::Malformed`] when the identifier or URL is invalid.
    pub fn service_url(&self, id: &str) -> Result<Url, ServiceError> {
        let requested = ServiceId::parse(id)?;
        let malformed = |reason: String| ServiceError::Malformed {
            service: id.to_string(),
            reason,
        };
        match self.services.get(id) {
            Some(Value::String(raw)) => {
                let url = self.base.join(raw).map_err(|err| malformed(err.to_string()))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(malformed(format!("unsupported url scheme '{}'", url.scheme())));
                }
                Ok(url)
            }
            Some(_) => Err(malformed("service url must be a string".to_string())),
            None => {
                let supported: Vec<String> = self
                    .services
                    .keys()
                    .filter(|key| ServiceId::parse(key).is_ok_and(|other| other.name() == requested.name()))
                    .cloned()
                    .collect();
                if supported.is_empty() {
                    Err(ServiceError::NotProvided {
                        service: id.to_string(),
                    })
                } else {
                    Err(ServiceError::VersionNotSupported {
                        requested: id.to_string(),
                        supported,
                    })
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Discovery Results
// ============================================================================

/// Discovery outcome handed to client construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryContext {
    /// Selected service identifier.
    pub service_id: String,
    /// Resolved service URL.
    pub service_url: Url,
    /// Version constraint, when the host declared one.
    pub constraint: Option<VersionConstraint>,
}

/// Options controlling discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Fetch discovery documents over plain HTTP instead of HTTPS.
    pub allow_http: bool,
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Host discovery with a per-host document cache.
///
/// # Invariants
/// - Cached documents are keyed by hostname and transport security, so a
///   document fetched without certificate verification is never reused by a
///   verifying client.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Discovery options.
    options: DiscoveryOptions,
    /// Fetched documents keyed by host and insecure flag.
    documents: Mutex<HashMap<(Hostname, bool), DiscoveryDocument>>,
}

impl Discovery {
    /// Creates a discovery instance with an empty document cache.
    #[must_use]
    pub fn new(options: DiscoveryOptions) -> Self {
        Self {
            options,
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configured options.
    #[must_use]
    pub const fn options(&self) -> DiscoveryOptions {
        self.options
    }

    /// Forgets every cached discovery document.
    pub fn clear(&self) {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Discovers the preferred API service of `host`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the document cannot be obtained, a
    /// service lookup fails fatally, or no supported version is offered.
    pub fn discover(
        &self,
        transport: &HttpTransport,
        host: &Hostname,
        credentials: &dyn CredentialsSource,
        overrides: &HostServiceConfig,
    ) -> Result<DiscoveryContext, DiscoveryError> {
        let document = self.document(transport, host, credentials, overrides)?;
        let mut tried = Vec::with_capacity(API_SERVICE_IDS.len());
        for id in API_SERVICE_IDS {
            match document.service_url(id) {
                Ok(service_url) => {
                    debug!(host = %host, service = id, url = %service_url, "selected hostlink api service");
                    let constraint = version_constraint(transport, host, &document, id, credentials);
                    return Ok(DiscoveryContext {
                        service_id: id.to_string(),
                        service_url,
                        constraint,
                    });
                }
                Err(err) if err.is_version_not_supported() => {
                    debug!(host = %host, service = id, error = %err, "api version not offered; trying next");
                    tried.push(id.to_string());
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(DiscoveryError::NoSupportedService {
            host: host.to_string(),
            tried,
        })
    }

    /// Returns the discovery document for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the document cannot be fetched or parsed.
    pub fn document(
        &self,
        transport: &HttpTransport,
        host: &Hostname,
        credentials: &dyn CredentialsSource,
        overrides: &HostServiceConfig,
    ) -> Result<DiscoveryDocument, DiscoveryError> {
        let well_known = self.well_known_url(host)?;
        if let Some(services) = overrides.services_for(host) {
            debug!(host = %host, "using locally configured services; skipping network discovery");
            return Ok(DiscoveryDocument::from_services(well_known, services));
        }
        let key = (host.clone(), transport.is_insecure());
        if let Some(document) = self.documents.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(document.clone());
        }
        let document = fetch_document(transport, &well_known, credentials.token_for_host(host).as_deref())?;
        self.documents.lock().unwrap_or_else(PoisonError::into_inner).insert(key, document.clone());
        Ok(document)
    }

    /// Builds the well-known discovery URL for `host`.
    fn well_known_url(&self, host: &Hostname) -> Result<Url, DiscoveryError> {
        let scheme = if self.options.allow_http { "http" } else { "https" };
        Url::parse(&format!("{scheme}://{host}{WELL_KNOWN_PATH}")).map_err(|err| DiscoveryError::InvalidUrl {
            host: host.to_string(),
            reason: err.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Fetching
// ============================================================================

/// Fetches the advisory version constraint for service `id`.
fn version_constraint(
    transport: &HttpTransport,
    host: &Hostname,
    document: &DiscoveryDocument,
    id: &str,
    credentials: &dyn CredentialsSource,
) -> Option<VersionConstraint> {
    let base = match document.service_url(VERSIONS_SERVICE_ID) {
        Ok(url) => url,
        Err(err) => {
            debug!(host = %host, error = %err, "no version constraint service advertised");
            return None;
        }
    };
    match fetch_constraint(transport, &base, id, credentials.token_for_host(host).as_deref()) {
        Ok(constraint) => constraint.filter(VersionConstraint::is_declared),
        Err(reason) => {
            warn!(host = %host, service = id, reason = %reason, "ignoring version constraint lookup failure");
            None
        }
    }
}

/// Retrieves and parses a discovery document.
fn fetch_document(
    transport: &HttpTransport,
    url: &Url,
    token: Option<&str>,
) -> Result<DiscoveryDocument, DiscoveryError> {
    let response = transport.send(transport.get_json(url, token))?;
    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let base = response.url().clone();
    let body = read_body_limited(response, MAX_DOCUMENT_BYTES)?;
    DiscoveryDocument::parse(base, &body)
}

/// Retrieves the constraint declared for `service_id`, if any.
fn fetch_constraint(
    transport: &HttpTransport,
    base: &Url,
    service_id: &str,
    token: Option<&str>,
) -> Result<Option<VersionConstraint>, String> {
    let service = ServiceId::parse(service_id).map_err(|err| err.to_string())?;
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| format!("version service url {base} cannot carry a path"))?
        .pop_if_empty()
        .push(service.name())
        .push(PRODUCT_NAME);
    let response = transport.send(transport.get_json(&url, token)).map_err(|err| err.to_string())?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(format!("constraint request to {url} returned status {}", status.as_u16()));
    }
    let body = read_body_limited(response, MAX_DOCUMENT_BYTES).map_err(|err| err.to_string())?;
    let constraint: VersionConstraint = serde_json::from_slice(&body).map_err(|err| err.to_string())?;
    Ok(Some(constraint))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
