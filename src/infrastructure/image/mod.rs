//! Avatar image handling.
//!
//! This module provides:
//! - Decoder selection and RGBA normalization
//! - Content-addressed disk caching
//! - The embedded placeholder avatar
//! - The fetch pipeline tying them together

pub mod decoder;
pub mod disk_cache;
pub mod fetcher;
pub mod placeholder;

pub use decoder::DecoderKind;
pub use disk_cache::{DiskImageCache, default_cache_dir};
pub use fetcher::{ImageFetcher, ImageFetcherConfig};
pub use placeholder::{PLACEHOLDER_PNG, placeholder};
