//! Domain types for avatar images and their cache identity.

use std::sync::Arc;

use md5::{Digest, Md5};

/// Deterministic cache identity of an image URL.
///
/// The key is the 128-bit MD5 digest of the URL bytes. Identical URLs always
/// map to the same key; collisions between distinct URLs are not defended
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 16]);

impl CacheKey {
    /// Derives the key for an image URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(url.as_bytes());
        let mut digest = [0u8; 16];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    /// Returns the 32-character uppercase hex form used as the cache file name.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<&str> for CacheKey {
    fn from(url: &str) -> Self {
        Self::from_url(url)
    }
}

/// Where a returned image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Decoded from an existing cache entry.
    DiskCache,
    /// Downloaded and decoded on this call.
    Network,
    /// The embedded fallback image.
    Placeholder,
}

impl ImageSource {
    /// Returns true if this is the fallback image rather than a real avatar.
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// A decoded, normalized image ready for rendering.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Cache key of the requested URL.
    pub key: CacheKey,
    /// The requested URL.
    pub url: String,
    /// RGBA8 pixels. Shared read-only between callers of the same URL.
    pub image: Arc<image::RgbaImage>,
    /// Where the pixels came from.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Returns the image dimensions as `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
