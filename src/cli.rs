//! Command-line interface parsing for picsum-cache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the cache configuration and request descriptors the library works with.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheKey, RequestDescriptor};
use crate::config::{CacheConfig, DEFAULT_TTL_HOURS};
use crate::images::{DEFAULT_IMAGE_SIZE, DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_RANDOM_COUNT};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No cache directory was given and none could be derived
    #[error("No cache directory could be determined; pass --cache-dir")]
    NoCacheDir,

    /// TTL is negative or too large to compute an expiry time
    #[error("Invalid TTL: {0} hours. TTL must be zero or more hours and within the supported date range")]
    InvalidTtl(i64),

    /// The cache key is not a 32-digit hex string
    #[error("Invalid cache key: '{0}'. Expected 32 hexadecimal digits")]
    InvalidKey(String),

    /// A descriptor parameter was not NAME=VALUE or NAME:=JSON
    #[error("Invalid parameter: '{0}'. Expected NAME=VALUE or NAME:=JSON")]
    InvalidParam(String),
}

/// picsum-cache - Cached access to the Picsum image API
#[derive(Parser, Debug)]
#[command(name = "picsum-cache")]
#[command(about = "Disk-cached access to the Picsum image listing API")]
#[command(version)]
pub struct Cli {
    /// Directory for cache entries (defaults to the platform cache directory)
    #[arg(long, global = true, env = "PICSUM_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Hours a cached response stays fresh
    #[arg(long, global = true, env = "PICSUM_CACHE_TTL_HOURS", default_value_t = DEFAULT_TTL_HOURS, allow_negative_numbers = true)]
    pub ttl_hours: i64,

    /// Base URL of the upstream listing API
    #[arg(long, global = true, env = "PICSUM_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed on the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List one page of images
    List {
        /// 1-based page number
        #[arg(long, default_value_t = DEFAULT_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Images per page
        #[arg(long, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
    /// Show metadata for one image
    Image {
        /// Picsum image id
        id: String,
    },
    /// Fetch the random feed
    Random {
        /// Number of images
        #[arg(long, default_value_t = DEFAULT_RANDOM_COUNT, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Print the URL of a resized image
    Url {
        /// Picsum image id
        id: String,
        /// Width in pixels
        #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
        width: u32,
        /// Height in pixels
        #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
        height: u32,
    },
    /// Show entry count and total size of the cache
    Stats,
    /// Remove expired entries
    Sweep,
    /// Remove one entry by its cache key
    Invalidate {
        /// 32-digit hex cache key
        key: String,
    },
    /// Print the cache key for a set of request parameters
    Key {
        /// Parameters, e.g. page:=2 limit:=3 or id=102
        #[arg(required = true, value_name = "NAME=VALUE|NAME:=JSON")]
        params: Vec<String>,
    },
    /// Sweep expired entries periodically until interrupted
    Watch {
        /// Seconds between sweeps
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
    },
}

impl Cli {
    /// Builds the cache configuration from the global options
    ///
    /// # Returns
    /// * `Ok(CacheConfig)` rooted at `--cache-dir` or the platform directory
    /// * `Err(CliError)` if the TTL is negative or out of range, or no directory is available
    pub fn cache_config(&self) -> Result<CacheConfig, CliError> {
        let invalid_ttl = || CliError::InvalidTtl(self.ttl_hours);
        if self.ttl_hours < 0 {
            return Err(invalid_ttl());
        }
        let ttl = chrono::Duration::try_hours(self.ttl_hours).ok_or_else(invalid_ttl)?;
        chrono::Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(invalid_ttl)?;
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => CacheConfig::default_dir().ok_or(CliError::NoCacheDir)?,
        };
        Ok(CacheConfig::with_dir(cache_dir).with_ttl(ttl))
    }
}

/// Parses a cache key argument
pub fn parse_key_arg(s: &str) -> Result<CacheKey, CliError> {
    s.parse().map_err(|_| CliError::InvalidKey(s.to_string()))
}

/// Parses one parameter
///
/// `NAME=VALUE` gives a string value; `NAME:=JSON` gives a JSON literal, so
/// `page:=2` is the number 2 while `id=102` stays the string "102".
pub fn parse_param_arg(s: &str) -> Result<(String, Value), CliError> {
    let invalid = || CliError::InvalidParam(s.to_string());
    let (name, raw) = s.split_once('=').ok_or_else(invalid)?;
    let (name, value) = match name.strip_suffix(':') {
        Some(name) => (name, serde_json::from_str(raw).map_err(|_| invalid())?),
        None => (name, Value::from(raw)),
    };
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((name.to_string(), value))
}

/// Builds a descriptor from NAME=VALUE parameters
pub fn descriptor_from_args(params: &[String]) -> Result<RequestDescriptor, CliError> {
    params.iter().try_fold(RequestDescriptor::new(), |descriptor, param| {
        let (name, value) = parse_param_arg(param)?;
        Ok(descriptor.with(name, value))
    })
}
