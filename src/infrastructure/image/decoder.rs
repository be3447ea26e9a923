//! Decoder selection and pixel normalization.
//!
//! Downloads are routed to a decoder by their declared `Content-Type`, with
//! format sniffing as the default and as the fallback when the declared
//! decoder rejects the bytes. Every decoded image is normalized to RGBA8.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegDecoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageResult, Limits, RgbaImage};
use tracing::{debug, trace};

use crate::domain::ports::{FetchError, FetchResult};

/// The closed set of decoders a download can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// Declared `image/jpeg`.
    Jpeg,
    /// Declared `image/gif`. Only the first frame is kept.
    Gif,
    /// Anything else: guess the format from the leading bytes.
    Sniff,
}

impl DecoderKind {
    /// Selects a decoder from a `Content-Type` header value.
    ///
    /// Parameters such as `; charset=binary` and letter case are ignored.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(mime) = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
        else {
            return Self::Sniff;
        };

        match ImageFormat::from_mime_type(&mime) {
            Some(ImageFormat::Jpeg) => Self::Jpeg,
            Some(ImageFormat::Gif) => Self::Gif,
            _ => Self::Sniff,
        }
    }

    /// Decodes `bytes` with this decoder.
    ///
    /// Every decoder runs under the default allocation limits, so an image
    /// whose header claims huge dimensions is rejected before any pixel
    /// buffer is allocated.
    ///
    /// # Errors
    /// Returns [`FetchError::Decode`] if the bytes are not a supported image
    /// or exceed the allocation limits.
    pub fn decode(self, bytes: &[u8]) -> FetchResult<DynamicImage> {
        let result = match self {
            Self::Jpeg => JpegDecoder::new(Cursor::new(bytes)).and_then(decode_limited),
            Self::Gif => GifDecoder::new(Cursor::new(bytes)).and_then(decode_limited),
            Self::Sniff => image::load_from_memory(bytes),
        };
        result.map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn decode_limited(mut decoder: impl ImageDecoder) -> ImageResult<DynamicImage> {
    decoder.set_limits(Limits::default())?;
    DynamicImage::from_decoder(decoder)
}

impl std::fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Gif => write!(f, "gif"),
            Self::Sniff => write!(f, "sniff"),
        }
    }
}

/// Decodes downloaded bytes into a normalized RGBA8 buffer.
///
/// The declared decoder is tried first; if it fails and was not already the
/// sniffing decoder, sniffing gets a second chance.
///
/// # Errors
/// Returns [`FetchError::Decode`] if no decoder accepts the bytes.
pub fn decode_download(bytes: &[u8], content_type: Option<&str>) -> FetchResult<RgbaImage> {
    let kind = DecoderKind::from_content_type(content_type);
    trace!(decoder = %kind, content_type = ?content_type, "Selected decoder");

    let decoded = match kind.decode(bytes) {
        Ok(img) => img,
        Err(e) if kind != DecoderKind::Sniff => {
            debug!(decoder = %kind, error = %e, "Declared decoder failed, sniffing format");
            DecoderKind::Sniff.decode(bytes)?
        }
        Err(e) => return Err(e),
    };

    Ok(normalize(decoded))
}

/// Decodes a cache entry. Cache entries are always sniffed.
///
/// # Errors
/// Returns [`FetchError::Decode`] if the entry is corrupt or truncated.
pub fn decode_cached(bytes: &[u8]) -> FetchResult<RgbaImage> {
    DecoderKind::Sniff.decode(bytes).map(normalize)
}

/// Converts any decoded image into the uniform RGBA8 representation.
///
/// Palette, grayscale, 16-bit and float sources are all expanded; the
/// source dimensions are kept.
#[must_use]
pub fn normalize(img: DynamicImage) -> RgbaImage {
    match img {
        DynamicImage::ImageRgba8(rgba) => rgba,
        other => other.into_rgba8(),
    }
}

/// Encodes a normalized image as PNG, the single cache entry codec.
///
/// # Errors
/// Returns [`FetchError::CacheWrite`] if encoding fails.
pub fn encode_png(img: &RgbaImage) -> FetchResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| FetchError::CacheWrite(format!("Failed to encode PNG: {e}")))?;
    Ok(out)
}
