//! Picsum API client
//!
//! Fetches image metadata from `https://picsum.photos/v2`. Every call is one
//! HTTP GET; non-2xx responses are errors.

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::{ImageSource, PicsumImage};

/// Base URL for the Picsum listing API
const PICSUM_BASE_URL: &str = "https://picsum.photos/v2";

/// Base URL for sized image downloads
const PICSUM_IMAGE_URL: &str = "https://picsum.photos/id";

/// Errors that can occur when fetching from Picsum
#[derive(Debug, Error)]
pub enum PicsumError {
    /// HTTP request failed or returned an error status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for the Picsum listing API
#[derive(Debug, Clone)]
pub struct PicsumClient {
    client: Client,
    base_url: String,
}

impl Default for PicsumClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PicsumClient {
    /// Create a new PicsumClient with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: PICSUM_BASE_URL.to_string(),
        }
    }

    /// Create a new PicsumClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: PICSUM_BASE_URL.to_string(),
        }
    }

    /// Points the client at another base URL (mirrors, local fakes)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn list_url(&self, page: u32, limit: u32) -> String {
        format!("{}/list?page={}&limit={}", self.base_url, page, limit)
    }

    fn info_url(&self, id: &str) -> String {
        format!("{}/id/{}/info", self.base_url, encode_segment(id))
    }

    fn random_url(&self, count: u32) -> String {
        format!("{}/list?limit={}", self.base_url, count)
    }

    /// Performs a GET and parses the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PicsumError> {
        debug!(url, "requesting upstream");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl ImageSource for PicsumClient {
    async fn list_images(&self, page: u32, limit: u32) -> Result<Vec<PicsumImage>, PicsumError> {
        self.get_json(&self.list_url(page, limit)).await
    }

    async fn image_info(&self, id: &str) -> Result<PicsumImage, PicsumError> {
        self.get_json(&self.info_url(id)).await
    }

    async fn random_images(&self, count: u32) -> Result<Vec<PicsumImage>, PicsumError> {
        self.get_json(&self.random_url(count)).await
    }
}

/// URL of an image resized to `width` x `height`
pub fn image_url(id: &str, width: u32, height: u32) -> String {
    format!("{}/{}/{}/{}", PICSUM_IMAGE_URL, encode_segment(id), width, height)
}

/// Percent-encodes characters that would break out of a path segment
fn encode_segment(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '%' => "%25".to_string(),
            '/' => "%2F".to_string(),
            '?' => "%3F".to_string(),
            '#' => "%23".to_string(),
            ' ' => "%20".to_string(),
            c => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_implementation() {
        let client = PicsumClient::default();
        assert_eq!(client.base_url, "https://picsum.photos/v2");
    }

    #[test]
    fn test_list_url() {
        let client = PicsumClient::new();
        assert_eq!(
            client.list_url(2, 3),
            "https://picsum.photos/v2/list?page=2&limit=3"
        );
    }

    #[test]
    fn test_info_url() {
        let client = PicsumClient::new();
        assert_eq!(client.info_url("102"), "https://picsum.photos/v2/id/102/info");
    }

    #[test]
    fn test_random_url_uses_limit_only() {
        let client = PicsumClient::new();
        assert_eq!(client.random_url(10), "https://picsum.photos/v2/list?limit=10");
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = PicsumClient::new().with_base_url("http://localhost:8080/v2/");
        assert_eq!(client.list_url(1, 5), "http://localhost:8080/v2/list?page=1&limit=5");
    }

    #[test]
    fn test_image_url() {
        assert_eq!(image_url("237", 400, 400), "https://picsum.photos/id/237/400/400");
        assert_eq!(image_url("10", 1920, 1080), "https://picsum.photos/id/10/1920/1080");
    }

    #[test]
    fn test_ids_cannot_escape_path_segment() {
        let client = PicsumClient::new();
        assert_eq!(
            client.info_url("../list?x=1"),
            "https://picsum.photos/v2/id/..%2Flist%3Fx=1/info"
        );
        assert_eq!(encode_segment("a b#%"), "a%20b%23%25");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_request_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let client = PicsumClient::new().with_base_url("http://127.0.0.1:9");
        let result = client.list_images(1, 1).await;
        assert!(matches!(result, Err(PicsumError::RequestFailed(_))));
    }
}
