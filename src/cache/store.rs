//! Disk-backed, TTL-bounded storage of JSON payloads
//!
//! Each entry is one `<key>.json` file in the cache directory. Writes go to a
//! temp file in the same directory and are renamed into place, so a reader
//! sees either the old record or the new one, never a partial file.
//!
//! Only files named `<32 hex digits>.json` are treated as entries; anything
//! else in the directory is left alone by `sweep_expired` and `stats`.
//!
//! Expired entries are re-read just before they are removed, so a fresh record
//! written in the meantime survives. A put landing between that second read
//! and the removal can still be lost; the next request then refetches.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CacheError, CacheKey, RequestDescriptor};
use crate::config::CacheConfig;

/// Extension of persisted entry files
const ENTRY_EXTENSION: &str = "json";

/// On-disk record
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// When the entry was written
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    /// Last instant the entry is valid
    #[serde(rename = "expiresAt", with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
    /// The cached payload
    data: T,
}

/// Only the timestamps of a record, used when the payload is not needed
#[derive(Debug, Deserialize)]
struct EntryHeader {
    #[serde(rename = "expiresAt", with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
}

/// Approximate size of the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entry files
    pub entry_count: usize,
    /// Sum of entry file sizes in bytes
    pub total_bytes: u64,
}

/// Keyed storage of JSON payloads with a fixed TTL
///
/// All operations are best-effort: read failures behave as misses and write
/// failures are logged. Cloning is cheap and clones share the same directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where entry files are stored
    cache_dir: PathBuf,
    /// Lifetime of every entry written by this store
    ttl: Duration,
}

impl CacheStore {
    /// Creates a store from an explicit configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache_dir: config.cache_dir,
            ttl: config.ttl,
        }
    }

    /// Creates a store in a custom directory with the default TTL
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self::new(CacheConfig::with_dir(cache_dir))
    }

    /// The directory this store persists to
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The TTL applied to new entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the path of the entry file for a key
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key.as_str(), ENTRY_EXTENSION))
    }

    /// Reads a fresh payload for the descriptor
    ///
    /// Returns `None` if there is no entry, the entry cannot be read or parsed,
    /// or it has expired. Expired entries are deleted on the way out.
    pub fn get<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Option<T> {
        let key = descriptor.key();
        let path = self.entry_path(&key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key = %key, error = %e, "cache read failed");
                }
                debug!(key = %key, %descriptor, "cache miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        let now = Utc::now();
        if now > entry.expires_at {
            debug!(key = %key, expired_at = %entry.expires_at, "cache entry expired");
            self.remove_if_expired(&path, now);
            return None;
        }

        debug!(key = %key, %descriptor, "cache hit");
        Some(entry.data)
    }

    /// Stores a payload for the descriptor, replacing any existing entry
    ///
    /// Failures are logged and swallowed: the cache is an optimization.
    pub fn put<T: Serialize>(&self, descriptor: &RequestDescriptor, data: &T) {
        let key = descriptor.key();
        match self.write_entry(&key, data) {
            Ok(()) => debug!(key = %key, %descriptor, "cached response"),
            Err(e) => warn!(key = %key, error = %e, "failed to write cache entry"),
        }
    }

    /// Writes one record atomically
    fn write_entry<T: Serialize>(&self, key: &CacheKey, data: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir)?;

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(CacheError::TtlOverflow)?;
        let entry = CacheEntry {
            created_at: now,
            expires_at,
            data,
        };
        let json = serde_json::to_vec_pretty(&entry)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", key.as_str()))
            .suffix(".tmp")
            .tempfile_in(&self.cache_dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Removes the entry for a key; removing a missing entry is not an error
    pub fn invalidate(&self, key: &CacheKey) {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => debug!(key = %key, "cache entry removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %key, error = %e, "failed to remove cache entry"),
        }
    }

    /// Removes the entry for a descriptor
    pub fn invalidate_descriptor(&self, descriptor: &RequestDescriptor) {
        self.invalidate(&descriptor.key());
    }

    /// Removes every expired entry and returns how many were removed
    ///
    /// Each file is checked and removed on its own, so concurrent readers and
    /// writers are never blocked. Entry files that cannot be parsed are removed
    /// and counted too, since they can never be served.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let removed = self
            .entry_files()
            .filter(|path| self.remove_if_expired(path, now))
            .count();

        if removed > 0 {
            info!(removed, "swept expired cache entries");
        }
        removed
    }

    /// Reads an entry file and deletes it if it is expired (or unparseable) as of `now`
    ///
    /// Returns whether the file was removed.
    fn remove_if_expired(&self, path: &Path, now: DateTime<Utc>) -> bool {
        let expired = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<EntryHeader>(&content) {
                Ok(header) => now > header.expires_at,
                Err(_) => true,
            },
            // Removed by someone else since the listing
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable cache file");
                return false;
            }
        };
        if !expired {
            return false;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "expired cache entry removed");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove expired entry");
                false
            }
        }
    }

    /// Counts entries and their total size
    ///
    /// Not a point-in-time snapshot: entries changing during the scan may or
    /// may not be counted.
    pub fn stats(&self) -> CacheStats {
        self.entry_files()
            .filter_map(|path| fs::metadata(path).ok())
            .fold(CacheStats::default(), |stats, meta| CacheStats {
                entry_count: stats.entry_count + 1,
                total_bytes: stats.total_bytes + meta.len(),
            })
    }

    /// Lists files named `<key>.json`; a missing or unreadable directory yields nothing
    fn entry_files(&self) -> impl Iterator<Item = PathBuf> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => Some(entries),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %self.cache_dir.display(), error = %e, "cannot list cache directory");
                }
                None
            }
        };

        entries
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
                    && path
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .is_some_and(|stem| stem.parse::<CacheKey>().is_ok())
            })
    }
}
