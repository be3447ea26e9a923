//! Port definition for avatar image fetching.

use std::sync::Arc;

use crate::domain::entities::LoadedImage;

/// Result type for fetch pipeline stages.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failures inside the fetch pipeline.
///
/// None of these cross the fetcher boundary; they are logged and replaced
/// with the placeholder image.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, timeout or body read failure.
    #[error("network error: {0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        /// Numeric status code.
        status: u16,
    },
    /// The bytes could not be decoded as an image.
    #[error("decode error: {0}")]
    Decode(String),
    /// The cache entry could not be read.
    #[error("cache read error: {0}")]
    CacheRead(String),
    /// The cache entry could not be written.
    #[error("cache write error: {0}")]
    CacheWrite(String),
}

/// Port for resolving an image URL to decoded pixels.
///
/// Implementations must be thread-safe and must never fail: any problem is
/// absorbed and reported as [`ImageSource::Placeholder`](crate::domain::entities::ImageSource).
#[async_trait::async_trait]
pub trait ImageFetcherPort: Send + Sync {
    /// Loads the image behind `url`, tagged with where it came from.
    async fn load(&self, url: &str) -> LoadedImage;

    /// Loads the image behind `url` and returns only the pixels.
    async fn fetch(&self, url: &str) -> Arc<image::RgbaImage> {
        self.load(url).await.image
    }
}
