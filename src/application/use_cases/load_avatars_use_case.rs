//! Timeline avatar loading use case.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::domain::entities::{LoadedImage, TimelineEntry, TimelineRow};
use crate::domain::ports::ImageFetcherPort;

/// Default number of avatar loads allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Resolves the avatar of every timeline entry concurrently.
///
/// Each entry gets its own future and result slot; results are merged in
/// input order once all have finished.
pub struct LoadAvatarsUseCase {
    fetcher: Arc<dyn ImageFetcherPort>,
    semaphore: Arc<Semaphore>,
}

impl LoadAvatarsUseCase {
    /// Creates new use case.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetcherPort>, max_concurrent_fetches: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
        }
    }

    /// Loads avatars for `entries`, returning one row per entry in the same order.
    pub async fn execute(&self, entries: Vec<TimelineEntry>) -> Vec<TimelineRow> {
        let urls: Vec<String> = entries.iter().map(|e| e.avatar_url().to_string()).collect();
        let avatars = self.load_urls(&urls).await;

        entries
            .into_iter()
            .zip(avatars)
            .map(|(entry, avatar)| TimelineRow { entry, avatar })
            .collect()
    }

    /// Loads every URL, returning images in the same order as `urls`.
    pub async fn load_urls(&self, urls: &[String]) -> Vec<LoadedImage> {
        debug!(count = urls.len(), "Loading avatars");

        let loads = urls.iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&self.semaphore);
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                fetcher.load(url).await
            }
        });
        let images = join_all(loads).await;

        let placeholders = images.iter().filter(|i| i.source.is_placeholder()).count();
        info!(
            count = images.len(),
            placeholders = placeholders,
            "Avatars loaded"
        );
        images
    }
}
