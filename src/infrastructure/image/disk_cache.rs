//! Content-addressed disk cache for normalized avatar images.
//!
//! Entries live directly in the cache directory, named by the uppercase hex
//! cache key with no extension, and always hold PNG bytes. Entries are never
//! evicted; the directory persists across sessions.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tokio::fs;
use tracing::{debug, trace};

use crate::domain::entities::CacheKey;
use crate::domain::ports::{FetchError, FetchResult};

use super::decoder::{decode_cached, encode_png};

/// Disk-backed store of PNG-encoded cache entries.
#[derive(Debug, Clone)]
pub struct DiskImageCache {
    cache_dir: PathBuf,
}

impl DiskImageCache {
    /// Opens a cache in the specified directory, creating it if needed.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be created.
    pub async fn new(cache_dir: PathBuf) -> FetchResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| FetchError::CacheWrite(format!("Failed to create cache dir: {e}")))?;
        Ok(Self { cache_dir })
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the entry for `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.to_hex())
    }

    /// Reads the raw bytes of an entry.
    ///
    /// Returns `Ok(None)` when there is no entry for `key`.
    ///
    /// # Errors
    /// Returns [`FetchError::CacheRead`] if the entry exists but cannot be read.
    pub async fn get_bytes(&self, key: &CacheKey) -> FetchResult<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                Ok(None)
            }
            Err(e) => Err(FetchError::CacheRead(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Loads and decodes an entry.
    ///
    /// Returns `Ok(None)` on a miss.
    ///
    /// # Errors
    /// Returns an error if the entry is unreadable, corrupt or truncated.
    pub async fn get(&self, key: &CacheKey) -> FetchResult<Option<RgbaImage>> {
        let Some(bytes) = self.get_bytes(key).await? else {
            return Ok(None);
        };

        let img = tokio::task::spawn_blocking(move || decode_cached(&bytes))
            .await
            .map_err(|e| FetchError::Decode(format!("Decode task panicked: {e}")))??;

        debug!(key = %key, "Decoded image from disk cache");
        Ok(Some(img))
    }

    /// Encodes a normalized image as PNG and stores it under `key`.
    ///
    /// # Errors
    /// Returns [`FetchError::CacheWrite`] if encoding or writing fails.
    pub async fn put(&self, key: &CacheKey, img: &RgbaImage) -> FetchResult<()> {
        let img = img.clone();
        let bytes = tokio::task::spawn_blocking(move || encode_png(&img))
            .await
            .map_err(|e| FetchError::CacheWrite(format!("Encode task panicked: {e}")))??;
        self.put_bytes(key, bytes).await
    }

    /// Stores already-encoded bytes under `key`.
    ///
    /// The bytes are written to a temporary file in the cache directory and
    /// renamed into place, so a reader sees either no entry or a whole one.
    ///
    /// # Errors
    /// Returns [`FetchError::CacheWrite`] if the file cannot be written.
    pub async fn put_bytes(&self, key: &CacheKey, bytes: Vec<u8>) -> FetchResult<()> {
        let path = self.entry_path(key);
        let dir = self.cache_dir.clone();
        let size = bytes.len();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| FetchError::CacheWrite(format!("Write task panicked: {e}")))?
            .map_err(|e| FetchError::CacheWrite(format!("Failed to write cache file: {e}")))?;

        debug!(key = %key, path = %path.display(), size = size, "Stored image in disk cache");
        Ok(())
    }

    /// Checks if an entry exists for `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.entry_path(key)).await.unwrap_or(false)
    }

    /// Returns the number of entries in the cache directory.
    ///
    /// Temporary files from in-progress writes are not counted.
    pub async fn len(&self) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return 0;
        };

        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry
                .file_name()
                .to_str()
                .is_some_and(is_entry_name)
            {
                count += 1;
            }
        }
        count
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Returns true for file names of the form produced by [`CacheKey::to_hex`].
fn is_entry_name(name: &str) -> bool {
    name.len() == 32
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from(
        crate::APP_QUALIFIER,
        crate::APP_ORGANIZATION,
        crate::NAME,
    )
    .map_or_else(
        || std::env::temp_dir().join(crate::NAME).join("avatars"),
        |dirs| dirs.cache_dir().join("avatars"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();
        (cache, temp_dir)
    }

    fn sample_image() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 16 + y) as u8;
            image::Rgba([v, 255 - v, 0, 255])
        })
    }

    #[tokio::test]
    async fn test_entry_path_is_uppercase_hex_without_extension() {
        let (cache, temp) = create_test_cache().await;
        let key = CacheKey::from_url("abc");

        let path = cache.entry_path(&key);
        assert_eq!(path, temp.path().join("900150983CD24FB0D6963F7D28E17F72"));
        assert!(path.extension().is_none());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/a.png");
        let img = sample_image();

        cache.put(&key, &img).await.unwrap();
        let restored = cache.get(&key).await.unwrap().unwrap();

        assert_eq!(restored, img);
        let bytes = cache.get_bytes(&key).await.unwrap().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/missing.png");

        assert!(cache.get_bytes(&key).await.unwrap().is_none());
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.contains(&key).await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_decode_error() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/corrupt.png");

        cache
            .put_bytes(&key, b"\x89PNG\r\n\x1a\ntruncated".to_vec())
            .await
            .unwrap();

        assert!(cache.contains(&key).await);
        assert!(matches!(cache.get(&key).await, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_len_ignores_foreign_files() {
        let (cache, temp) = create_test_cache().await;

        cache
            .put(&CacheKey::from_url("one"), &sample_image())
            .await
            .unwrap();
        cache
            .put(&CacheKey::from_url("two"), &sample_image())
            .await
            .unwrap();
        std::fs::write(temp.path().join(".tmpXYZ"), b"partial").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"hello").unwrap();

        assert_eq!(cache.len().await, 2);
        assert!(!cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_overwrite_same_key() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/a.png");

        cache.put_bytes(&key, b"first".to_vec()).await.unwrap();
        cache.put_bytes(&key, b"second".to_vec()).await.unwrap();

        assert_eq!(cache.get_bytes(&key).await.unwrap().unwrap(), b"second");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_read_error() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/dir.png");
        std::fs::create_dir(cache.entry_path(&key)).unwrap();

        assert!(matches!(
            cache.get_bytes(&key).await,
            Err(FetchError::CacheRead(_))
        ));
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("avatars");

        let cache = DiskImageCache::new(dir.clone()).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(cache.cache_dir(), dir.as_path());
        assert!(cache.is_empty().await);
    }
}
