//! Request descriptors and the cache keys derived from them

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::CacheError;

/// Number of digest bytes kept for a cache key (128 bits)
const KEY_BYTES: usize = 16;

/// The logical identity of one cacheable query, e.g. `{page, limit}` or `{id}`
///
/// Parameters live in a sorted map, so the canonical form does not depend on
/// the order callers add them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    params: BTreeMap<String, Value>,
}

impl RequestDescriptor {
    /// Creates an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named parameter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), canonicalize(value.into()));
        self
    }

    /// Builds a descriptor from any value that serializes to a JSON object
    ///
    /// # Returns
    /// * `Ok(RequestDescriptor)` with one parameter per object field
    /// * `Err(CacheError::InvalidDescriptor)` if `params` is not an object
    pub fn from_params<P: Serialize>(params: &P) -> Result<Self, CacheError> {
        match serde_json::to_value(params)? {
            Value::Object(fields) => Ok(fields
                .into_iter()
                .fold(Self::new(), |descriptor, (name, value)| descriptor.with(name, value))),
            _ => Err(CacheError::InvalidDescriptor),
        }
    }

    /// Returns the value of a parameter, if present
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Compact JSON with sorted keys at every nesting level
    pub fn canonical(&self) -> String {
        // A map of JSON values always serializes
        serde_json::to_string(&self.params).unwrap_or_default()
    }

    /// Derives the storage key for this descriptor
    pub fn key(&self) -> CacheKey {
        let digest = Sha256::digest(self.canonical().as_bytes());
        CacheKey(
            digest[..KEY_BYTES]
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect(),
        )
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Rebuilds nested objects with their keys in sorted order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(fields) => {
            let sorted: BTreeMap<String, Value> = fields
                .into_iter()
                .map(|(name, value)| (name, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Fixed-length hexadecimal digest naming one descriptor's storage slot
///
/// Distinct descriptors sharing a key silently share a slot; with a 128-bit
/// digest this is not detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as its 32-character hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == KEY_BYTES * 2 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(CacheKey(s.to_ascii_lowercase()))
        } else {
            Err(CacheError::InvalidKey(s.to_string()))
        }
    }
}
