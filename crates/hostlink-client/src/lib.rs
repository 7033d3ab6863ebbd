// crates/hostlink-client/src/lib.rs
// ============================================================================
// Module: Hostlink Client Library
// Description: Connection bootstrap for Hostlink API clients.
// Purpose: Resolve, discover, version-check, and cache host clients.
// Dependencies: hostlink-config, reqwest, semver, serde, serde_json, sha2, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! `hostlink-client` turns caller settings plus local configuration into a
//! ready-to-use [`HostClient`]:
//!
//! 1. [`Resolver::resolve_settings`] picks hostname, token, and the insecure flag.
//! 2. [`Discovery`] maps the host to its newest supported API endpoint.
//! 3. [`check_constraints`] compares the running version with the host's constraint.
//! 4. [`Connector`] caches the resulting client by configuration [`Fingerprint`].
//!
//! Security posture: discovery and constraint documents are remote input and
//! are size-limited; tokens never appear in logs or `Debug` output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod client;
pub mod connector;
pub mod discovery;
pub mod fingerprint;
pub mod resolver;
pub mod transport;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::ClientCache;
pub use client::HostClient;
pub use connector::Connector;
pub use discovery::Discovery;
pub use discovery::DiscoveryContext;
pub use discovery::DiscoveryDocument;
pub use discovery::DiscoveryError;
pub use discovery::DiscoveryOptions;
pub use discovery::ServiceError;
pub use fingerprint::Fingerprint;
pub use resolver::ClientConfiguration;
pub use resolver::ExplicitSettings;
pub use resolver::ResolveError;
pub use resolver::ResolveErrorKind;
pub use resolver::ResolvedSettings;
pub use resolver::Resolver;
pub use resolver::ResolverOptions;
pub use transport::HttpTransport;
pub use transport::TransportError;
pub use version::ConstraintViolation;
pub use version::VersionConstraint;
pub use version::check_constraints;
