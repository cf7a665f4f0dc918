//! Cache module for storing upstream API responses to disk
//!
//! Responses are keyed by a [`RequestDescriptor`], the canonical identity of one
//! logical query, and persisted as one JSON file per [`CacheKey`] with a fixed
//! TTL. The [`FetchCoordinator`] gives callers cache-or-fetch semantics on top
//! of the [`CacheStore`]. Storage failures never reach callers: unreadable
//! entries are misses and failed writes are logged and dropped.

mod coordinator;
mod key;
mod store;

pub use coordinator::{FetchCoordinator, Fetched};
pub use key::{CacheKey, RequestDescriptor};
pub use store::{CacheStats, CacheStore};

use thiserror::Error;

/// Errors raised inside the cache layer
///
/// Only [`CacheError::InvalidKey`] and [`CacheError::InvalidDescriptor`] are
/// returned to callers; I/O and serialization failures are absorbed by the store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the storage directory failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded
    #[error("Failed to serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A cache key string was not 32 hexadecimal digits
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),

    /// The TTL pushes the expiry past the representable date range
    #[error("TTL is too large to compute an expiry time")]
    TtlOverflow,

    /// Request parameters did not serialize to a JSON object
    #[error("Request parameters must serialize to a JSON object")]
    InvalidDescriptor,
}
