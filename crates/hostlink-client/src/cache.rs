// crates/hostlink-client/src/cache.rs
// ============================================================================
// Module: Client Cache
// Description: Fingerprint-keyed, single-flight cache of constructed clients.
// Purpose: Reuse clients for identical configurations across threads.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`ClientCache`] maps a [`Fingerprint`] to a shared client. Each fingerprint
//! owns a slot guarded by its own mutex; the map lock is held only long enough
//! to find or create the slot, so construction for one fingerprint never
//! blocks lookups of another.
//!
//! Invariants:
//! - For a given fingerprint, the factory runs at most once per successful insertion.
//! - Concurrent callers with the same fingerprint observe the same client.
//! - A failed construction leaves the slot empty so a later call can retry.
//! - Entries are never evicted except by [`ClientCache::clear`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::fingerprint::Fingerprint;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-fingerprint slot; locked for the duration of construction.
type Slot<C> = Arc<Mutex<Option<Arc<C>>>>;

/// Process-wide store of constructed clients.
pub struct ClientCache<C> {
    /// Slots keyed by configuration fingerprint.
    slots: Mutex<HashMap<Fingerprint, Slot<C>>>,
}

impl<C> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for ClientCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache").field("len", &self.len()).finish()
    }
}

impl<C> ClientCache<C> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client stored for `fingerprint`, running `factory` when absent.
    ///
    /// Callers racing on the same fingerprint wait for the first construction
    /// and share its result.
    ///
    /// # Errors
    ///
    /// Returns the factory error unchanged; nothing is cached in that case.
    pub fn get_or_try_insert<E, F>(&self, fingerprint: &Fingerprint, factory: F) -> Result<Arc<C>, E>
    where
        F: FnOnce() -> Result<C, E>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(fingerprint.clone()).or_default())
        };
        let mut guard = lock(&slot);
        if let Some(client) = guard.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(factory()?);
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Returns the cached client for `fingerprint`, if construction completed.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<C>> {
        let slot = lock(&self.slots).get(fingerprint).cloned()?;
        let guard = lock(&slot);
        guard.clone()
    }

    /// Returns the number of constructed clients.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<C>> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    /// Returns true when no client has been constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached client; outstanding handles stay valid.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
