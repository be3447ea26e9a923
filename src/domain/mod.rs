//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, ImageSource, LoadedImage};
pub use ports::{FetchError, ImageFetcherPort};
