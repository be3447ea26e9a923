//! Embedded fallback avatar.

use std::sync::{Arc, LazyLock};

use image::{Rgba, RgbaImage};
use tracing::error;

use super::decoder::decode_cached;

/// Encoded placeholder asset (48×48 opaque black PNG).
pub const PLACEHOLDER_PNG: &[u8] = include_bytes!("../../../assets/placeholder.png");

/// Side length used if the embedded asset ever fails to decode.
const FALLBACK_SIZE: u32 = 48;

static PLACEHOLDER: LazyLock<Arc<RgbaImage>> = LazyLock::new(|| {
    Arc::new(decode_cached(PLACEHOLDER_PNG).unwrap_or_else(|e| {
        error!(error = %e, "Embedded placeholder failed to decode");
        RgbaImage::from_pixel(FALLBACK_SIZE, FALLBACK_SIZE, Rgba([0, 0, 0, 255]))
    }))
});

/// Returns the decoded placeholder image.
///
/// Decoding happens once per process; every caller shares the same buffer.
#[must_use]
pub fn placeholder() -> Arc<RgbaImage> {
    Arc::clone(&PLACEHOLDER)
}
