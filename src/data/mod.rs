//! Core data models for the Picsum image API
//!
//! This module contains the image metadata returned by upstream, the response
//! shapes served to callers, and the [`ImageSource`] seam over upstream fetches.

pub mod picsum;

pub use picsum::{image_url, PicsumClient, PicsumError};

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Metadata for one image as listed by Picsum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicsumImage {
    /// Picsum image identifier (numeric, as a string)
    pub id: String,
    /// Photographer name
    pub author: String,
    /// Original width in pixels
    pub width: u32,
    /// Original height in pixels
    pub height: u32,
    /// Unsplash page for the photo
    pub url: String,
    /// Direct download URL for the original image
    pub download_url: String,
}

/// One page of a listing, as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePage {
    /// Images on this page
    pub images: Vec<PicsumImage>,
    /// Number of images on this page
    pub total: usize,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub limit: u32,
}

/// A listing page as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListResponse {
    /// Images on this page
    pub images: Vec<PicsumImage>,
    /// Number of images on this page
    pub total: usize,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub limit: u32,
    /// Whether the page was served from the cache
    pub from_cache: bool,
}

impl ImageListResponse {
    /// Attaches the cache flag to a stored page
    pub fn from_page(page: ImagePage, from_cache: bool) -> Self {
        Self {
            images: page.images,
            total: page.total,
            page: page.page,
            limit: page.limit,
            from_cache,
        }
    }
}

/// Upstream operations the images service needs
///
/// Implemented by [`PicsumClient`]; tests substitute an in-memory source.
pub trait ImageSource {
    /// Lists one page of images
    fn list_images(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<PicsumImage>, PicsumError>> + Send;

    /// Fetches metadata for a single image
    fn image_info(&self, id: &str)
        -> impl Future<Output = Result<PicsumImage, PicsumError>> + Send;

    /// Fetches `count` images for the random feed
    fn random_images(
        &self,
        count: u32,
    ) -> impl Future<Output = Result<Vec<PicsumImage>, PicsumError>> + Send;
}
