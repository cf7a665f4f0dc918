//! Cache configuration
//!
//! The storage root and TTL are passed explicitly into the store so tests and
//! callers can run isolated caches side by side.

use std::path::PathBuf;

use chrono::Duration;
use directories::ProjectDirs;

/// Default time-to-live for cache entries in hours
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Where the cache lives and how long entries stay fresh
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one `<key>.json` file per entry
    pub cache_dir: PathBuf,
    /// Lifetime of every entry written by the store
    pub ttl: Duration,
}

impl CacheConfig {
    /// Creates a config using the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/picsum-cache/` on Linux, or the platform equivalent.
    /// Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        Self::default_dir().map(Self::with_dir)
    }

    /// Creates a config rooted at a custom directory with the default TTL
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Replaces the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The platform cache directory for this application
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "picsum-cache")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }
}
