//! Cache-or-fetch coordination
//!
//! [`FetchCoordinator::get_or_fetch`] is the single point where upstream fetches
//! meet the cache. Each call runs independently: concurrent misses on the same
//! key each fetch and each write, and the last write wins.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::{CacheKey, CacheStats, CacheStore, RequestDescriptor};

/// A payload together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// The payload
    pub data: T,
    /// Whether the payload was served from the cache
    pub from_cache: bool,
}

/// Serves requests from the cache when fresh, otherwise from upstream
#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    store: CacheStore,
}

impl FetchCoordinator {
    /// Creates a coordinator over a store
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns the cached payload for `descriptor`, or fetches and caches it
    ///
    /// # Arguments
    /// * `descriptor` - Identity of the request
    /// * `fetch` - The upstream call, invoked only on a miss
    ///
    /// # Returns
    /// * `Ok(Fetched { from_cache: true, .. })` on a fresh hit
    /// * `Ok(Fetched { from_cache: false, .. })` after a successful fetch
    /// * `Err(E)` unchanged from `fetch`; failures are never cached or retried
    ///
    /// The store write follows the fetch with no await point in between, so a
    /// caller dropping this future leaves either nothing or a complete entry.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        descriptor: &RequestDescriptor,
        fetch: F,
    ) -> Result<Fetched<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.store.get::<T>(descriptor) {
            return Ok(Fetched {
                data,
                from_cache: true,
            });
        }

        debug!(%descriptor, "fetching from upstream");
        let data = fetch().await?;
        self.store.put(descriptor, &data);

        Ok(Fetched {
            data,
            from_cache: false,
        })
    }

    /// Removes one entry by key
    pub fn invalidate(&self, key: &CacheKey) {
        self.store.invalidate(key);
    }

    /// Removes the entry for a descriptor
    pub fn invalidate_descriptor(&self, descriptor: &RequestDescriptor) {
        self.store.invalidate_descriptor(descriptor);
    }

    /// Removes expired entries, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired()
    }

    /// Entry count and total size of the cache
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}
