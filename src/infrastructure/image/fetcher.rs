//! Avatar fetch orchestrator.
//!
//! Resolves a URL through two tiers, Disk -> Network, and substitutes the
//! placeholder whenever neither produces a usable image. Concurrent loads of
//! the same URL share one in-flight operation.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use image::RgbaImage;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::domain::entities::{CacheKey, ImageSource, LoadedImage};
use crate::domain::ports::{FetchError, FetchResult, ImageFetcherPort};

use super::decoder::{decode_download, encode_png};
use super::disk_cache::DiskImageCache;
use super::placeholder::placeholder;

/// Configuration for the image fetcher.
#[derive(Debug, Clone)]
pub struct ImageFetcherConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ImageFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

type SharedLoad = Shared<BoxFuture<'static, LoadedImage>>;

/// Resolves avatar URLs to normalized RGBA images.
///
/// Never fails outwardly: every error is logged and replaced with the
/// placeholder. Cheap to share behind an `Arc`.
pub struct ImageFetcher {
    handle: FetcherHandle,
    in_flight: Arc<Mutex<HashMap<CacheKey, SharedLoad>>>,
    config: ImageFetcherConfig,
}

impl std::fmt::Debug for ImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFetcher")
            .field("cache_dir", &self.handle.disk_cache.cache_dir())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ImageFetcher {
    /// Creates a fetcher over the given disk cache.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: ImageFetcherConfig, disk_cache: DiskImageCache) -> FetchResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            handle: FetcherHandle {
                disk_cache,
                http_client,
            },
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            config,
        })
    }

    /// Returns the underlying disk cache.
    #[must_use]
    pub const fn disk_cache(&self) -> &DiskImageCache {
        &self.handle.disk_cache
    }

    /// Loads an image, checking the disk cache first.
    ///
    /// If a load for the same URL is already running, this call waits for it
    /// instead of starting another.
    pub async fn load(&self, url: &str) -> LoadedImage {
        let key = CacheKey::from_url(url);
        self.join_inflight(key, url).await
    }

    /// Loads an image and returns only its pixels.
    pub async fn fetch(&self, url: &str) -> Arc<RgbaImage> {
        self.load(url).await.image
    }

    /// Returns true if a load for `url` is currently running.
    #[must_use]
    pub fn is_loading(&self, url: &str) -> bool {
        self.in_flight.lock().contains_key(&CacheKey::from_url(url))
    }

    /// Returns the number of loads currently running.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn join_inflight(&self, key: CacheKey, url: &str) -> SharedLoad {
        let mut map = self.in_flight.lock();
        if let Some(existing) = map.get(&key) {
            trace!(key = %key, "Joining in-flight load");
            return existing.clone();
        }

        let handle = self.handle.clone();
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        };
        let owned_url = url.to_string();
        let task = tokio::spawn(async move {
            let _guard = guard;
            handle.resolve(key, &owned_url).await
        });

        let owned_url = url.to_string();
        let flight = async move {
            match task.await {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!(key = %key, error = %e, "Load task panicked");
                    placeholder_image(key, owned_url)
                }
            }
        }
        .boxed()
        .shared();

        map.insert(key, flight.clone());
        flight
    }
}

#[async_trait::async_trait]
impl ImageFetcherPort for ImageFetcher {
    async fn load(&self, url: &str) -> LoadedImage {
        Self::load(self, url).await
    }
}

/// Removes a key from the in-flight table when its load task ends.
///
/// Runs after the cache write on success, and during unwinding if the task
/// panics, so a failed load never pins its placeholder in the table.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashMap<CacheKey, SharedLoad>>>,
    key: CacheKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// State needed by a single load, detached from the in-flight table.
#[derive(Clone)]
struct FetcherHandle {
    disk_cache: DiskImageCache,
    http_client: reqwest::Client,
}

impl FetcherHandle {
    async fn resolve(&self, key: CacheKey, url: &str) -> LoadedImage {
        match self.disk_cache.get(&key).await {
            Ok(Some(img)) => {
                return LoadedImage {
                    key,
                    url: url.to_string(),
                    image: Arc::new(img),
                    source: ImageSource::DiskCache,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, url = %url, error = %e, "Cached image unusable, using placeholder");
                return placeholder_image(key, url.to_string());
            }
        }

        match self.load_from_network(&key, url).await {
            Ok(img) => {
                debug!(key = %key, source = "network", "Image loaded successfully");
                LoadedImage {
                    key,
                    url: url.to_string(),
                    image: Arc::new(img),
                    source: ImageSource::Network,
                }
            }
            Err(e) => {
                warn!(key = %key, url = %url, error = %e, "Failed to load image, using placeholder");
                placeholder_image(key, url.to_string())
            }
        }
    }

    /// Downloads, decodes and caches an image.
    ///
    /// A cache write failure is logged and does not fail the load.
    async fn load_from_network(&self, key: &CacheKey, url: &str) -> FetchResult<RgbaImage> {
        debug!(key = %key, url = %url, "Downloading image from network");
        let (bytes, content_type) = self.download(url).await?;

        let (img, encoded) = tokio::task::spawn_blocking(move || {
            let img = decode_download(&bytes, content_type.as_deref())?;
            let encoded = encode_png(&img);
            Ok::<_, FetchError>((img, encoded))
        })
        .await
        .map_err(|e| FetchError::Decode(format!("Decode task panicked: {e}")))??;

        let stored = match encoded {
            Ok(png) => self.disk_cache.put_bytes(key, png).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            warn!(key = %key, error = %e, "Failed to cache to disk");
        }

        Ok(img)
    }

    /// Downloads image bytes from a URL.
    async fn download(&self, url: &str) -> FetchResult<(Bytes, Option<String>)> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body: {e}")))?;

        Ok((bytes, content_type))
    }
}

fn placeholder_image(key: CacheKey, url: String) -> LoadedImage {
    LoadedImage {
        key,
        url,
        image: placeholder(),
        source: ImageSource::Placeholder,
    }
}
