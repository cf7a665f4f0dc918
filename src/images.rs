//! Cached image operations
//!
//! Maps each kind of query (page listing, id lookup, random feed) to a request
//! descriptor and serves it through the [`FetchCoordinator`]. Upstream errors
//! are passed on; fallback content is left to callers.

use thiserror::Error;

use crate::cache::{CacheKey, CacheStats, FetchCoordinator, Fetched, RequestDescriptor};
use crate::data::{
    image_url, ImageListResponse, ImagePage, ImageSource, PicsumError, PicsumImage,
};

/// Default page for listings
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size for listings
pub const DEFAULT_LIMIT: u32 = 10;
/// Default number of images in the random feed
pub const DEFAULT_RANDOM_COUNT: u32 = 10;
/// Default edge length for sized image URLs
pub const DEFAULT_IMAGE_SIZE: u32 = 400;

/// Errors returned by image operations
#[derive(Debug, Error)]
pub enum ImagesError {
    /// Listing a page failed upstream
    #[error("Failed to list images: {0}")]
    ListFailed(#[source] PicsumError),

    /// The image could not be fetched
    #[error("Image {id} not found: {source}")]
    NotFound {
        /// Requested image id
        id: String,
        /// Upstream failure
        source: PicsumError,
    },

    /// Fetching the random feed failed upstream
    #[error("Failed to fetch random images: {0}")]
    RandomFailed(#[source] PicsumError),
}

/// Descriptor for one listing page
pub fn list_descriptor(page: u32, limit: u32) -> RequestDescriptor {
    RequestDescriptor::new().with("page", page).with("limit", limit)
}

/// Descriptor for a single-image lookup
pub fn image_descriptor(id: &str) -> RequestDescriptor {
    RequestDescriptor::new().with("id", id)
}

/// Descriptor for the random feed
pub fn random_descriptor(count: u32) -> RequestDescriptor {
    RequestDescriptor::new()
        .with("count", count)
        .with("type", "random")
}

/// Image operations with cache-or-fetch semantics
#[derive(Debug, Clone)]
pub struct ImagesService<S> {
    coordinator: FetchCoordinator,
    source: S,
}

impl<S: ImageSource> ImagesService<S> {
    /// Creates a service over a coordinator and an upstream source
    pub fn new(coordinator: FetchCoordinator, source: S) -> Self {
        Self {
            coordinator,
            source,
        }
    }

    /// The coordinator used for every cached operation
    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    /// Lists one page of images
    pub async fn list_images(&self, page: u32, limit: u32) -> Result<ImageListResponse, ImagesError> {
        let fetched = self
            .coordinator
            .get_or_fetch(&list_descriptor(page, limit), || async {
                let images = self.source.list_images(page, limit).await?;
                Ok::<_, PicsumError>(ImagePage {
                    total: images.len(),
                    images,
                    page,
                    limit,
                })
            })
            .await
            .map_err(ImagesError::ListFailed)?;

        Ok(ImageListResponse::from_page(fetched.data, fetched.from_cache))
    }

    /// Looks up a single image by id
    pub async fn image_by_id(&self, id: &str) -> Result<Fetched<PicsumImage>, ImagesError> {
        self.coordinator
            .get_or_fetch(&image_descriptor(id), || self.source.image_info(id))
            .await
            .map_err(|source| ImagesError::NotFound {
                id: id.to_string(),
                source,
            })
    }

    /// Fetches the random feed
    pub async fn random_images(&self, count: u32) -> Result<Fetched<Vec<PicsumImage>>, ImagesError> {
        self.coordinator
            .get_or_fetch(&random_descriptor(count), || self.source.random_images(count))
            .await
            .map_err(ImagesError::RandomFailed)
    }

    /// URL of an image resized to `width` x `height`
    pub fn image_url(&self, id: &str, width: u32, height: u32) -> String {
        image_url(id, width, height)
    }

    /// Removes expired entries, returning how many were removed
    pub fn clean_cache(&self) -> usize {
        self.coordinator.sweep_expired()
    }

    /// Entry count and total size of the cache
    pub fn cache_stats(&self) -> CacheStats {
        self.coordinator.stats()
    }

    /// Removes one entry by key
    pub fn invalidate(&self, key: &CacheKey) {
        self.coordinator.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// In-memory upstream that counts calls and can be switched to fail
    #[derive(Debug, Default)]
    struct FakeSource {
        calls: AtomicUsize,
        failing: bool,
    }

    impl FakeSource {
        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond<T>(&self, value: T) -> Result<T, PicsumError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                Err(PicsumError::ParseError(
                    serde_json::from_str::<PicsumImage>("upstream unavailable").unwrap_err(),
                ))
            } else {
                Ok(value)
            }
        }
    }

    fn image(id: u32) -> PicsumImage {
        PicsumImage {
            id: id.to_string(),
            author: format!("Author {}", id),
            width: 800,
            height: 600,
            url: format!("https://unsplash.com/photos/{}", id),
            download_url: format!("https://picsum.photos/id/{}/800/600", id),
        }
    }

    impl ImageSource for FakeSource {
        async fn list_images(&self, page: u32, limit: u32) -> Result<Vec<PicsumImage>, PicsumError> {
            let start = (page - 1) * limit;
            self.respond((start..start + limit).map(image).collect())
        }

        async fn image_info(&self, id: &str) -> Result<PicsumImage, PicsumError> {
            self.respond(image(id.parse().unwrap_or(0)))
        }

        async fn random_images(&self, count: u32) -> Result<Vec<PicsumImage>, PicsumError> {
            self.respond((100..100 + count).map(image).collect())
        }
    }

    fn create_test_service(source: FakeSource) -> (ImagesService<FakeSource>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_dir(temp_dir.path().to_path_buf());
        (ImagesService::new(FetchCoordinator::new(store), source), temp_dir)
    }

    #[tokio::test]
    async fn test_list_images_caches_pages() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());

        let first = service.list_images(2, 3).await.unwrap();
        let second = service.list_images(2, 3).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.images, second.images);
        assert_eq!(second.total, 3);
        assert_eq!(second.page, 2);
        assert_eq!(second.limit, 3);
        assert_eq!(second.images[0].id, "3");
        assert_eq!(service.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_different_page_misses() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());

        service.list_images(2, 3).await.unwrap();
        let other = service.list_images(3, 3).await.unwrap();

        assert!(!other.from_cache);
        assert_eq!(other.images[0].id, "6");
        assert_eq!(service.source.calls(), 2);
        assert_eq!(service.cache_stats().entry_count, 2);
    }

    #[tokio::test]
    async fn test_image_by_id_caches() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());

        let first = service.image_by_id("102").await.unwrap();
        let second = service.image_by_id("102").await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.data.author, "Author 102");
        assert_eq!(service.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_random_is_keyed_apart_from_listing() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());

        let random = service.random_images(10).await.unwrap();
        let listing = service.list_images(1, 10).await.unwrap();

        assert!(!random.from_cache);
        assert!(!listing.from_cache);
        assert_eq!(random.data.len(), 10);
        assert_ne!(random.data[0], listing.images[0]);
        assert_ne!(random_descriptor(10).key(), list_descriptor(1, 10).key());
    }

    #[tokio::test]
    async fn test_upstream_failures_map_to_service_errors() {
        let (service, _temp_dir) = create_test_service(FakeSource::failing());

        assert!(matches!(
            service.list_images(1, 10).await,
            Err(ImagesError::ListFailed(_))
        ));
        match service.image_by_id("42").await {
            Err(ImagesError::NotFound { id, .. }) => assert_eq!(id, "42"),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(matches!(
            service.random_images(5).await,
            Err(ImagesError::RandomFailed(_))
        ));
        assert_eq!(service.cache_stats().entry_count, 0, "failures must not be cached");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());

        service.image_by_id("7").await.unwrap();
        service.invalidate(&image_descriptor("7").key());
        let again = service.image_by_id("7").await.unwrap();

        assert!(!again.from_cache);
        assert_eq!(service.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_clean_cache_keeps_fresh_entries() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());
        service.list_images(1, 2).await.unwrap();

        assert_eq!(service.clean_cache(), 0);
        assert_eq!(service.cache_stats().entry_count, 1);
    }

    #[test]
    fn test_image_url_defaults() {
        let (service, _temp_dir) = create_test_service(FakeSource::default());
        assert_eq!(
            service.image_url("5", DEFAULT_IMAGE_SIZE, DEFAULT_IMAGE_SIZE),
            "https://picsum.photos/id/5/400/400"
        );
    }
}
