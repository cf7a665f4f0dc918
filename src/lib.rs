//! picsum-cache Library
//!
//! A disk-backed request cache in front of the Picsum image API. This module
//! exposes the cache, the upstream client and the CLI parsing for the binary
//! and for integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod images;
pub mod sweep;
