//! Infrastructure layer with filesystem, network and configuration adapters.

/// Application configuration.
pub mod config;
/// Avatar image handling (decoding, disk cache, fetching).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigError, FetchConfig, LogLevel, StorageManager};
pub use self::image::{DecoderKind, DiskImageCache, ImageFetcher, ImageFetcherConfig, placeholder};
