// crates/hostlink-client/src/connector.rs
// ============================================================================
// Module: Connector
// Description: Cached entry point returning ready-to-use host clients.
// Purpose: Combine resolution with the fingerprint-keyed client cache.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`Connector::client`] resolves local settings on every call, fingerprints
//! them, and returns the cached client for that fingerprint. Transport
//! construction and discovery run only when the fingerprint is new, and at
//! most once even when many threads ask concurrently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::cache::ClientCache;
use crate::client::HostClient;
use crate::resolver::ExplicitSettings;
use crate::resolver::ResolveError;
use crate::resolver::Resolver;

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Resolver plus client cache.
#[derive(Debug)]
pub struct Connector {
    /// Configuration resolver.
    resolver: Resolver,
    /// Constructed clients keyed by fingerprint.
    cache: ClientCache<HostClient>,
}

impl Connector {
    /// Creates a connector with an empty cache.
    #[must_use]
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            cache: ClientCache::new(),
        }
    }

    /// Returns the resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Returns the client cache.
    #[must_use]
    pub const fn cache(&self) -> &ClientCache<HostClient> {
        &self.cache
    }

    /// Returns a client for `explicit`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when local resolution, discovery, or the
    /// version check fails. Failures are not cached.
    pub fn client(&self, explicit: &ExplicitSettings) -> Result<Arc<HostClient>, ResolveError> {
        let settings = self.resolver.resolve_settings(explicit)?;
        let fingerprint = settings.fingerprint();
        self.cache.get_or_try_insert(&fingerprint, || {
            debug!(host = %settings.hostname, fingerprint = %fingerprint, "constructing hostlink client");
            let config = self.resolver.configure(settings)?;
            Ok(HostClient::new(config))
        })
    }
}
