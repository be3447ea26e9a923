//! Domain entity definitions.

mod image;
mod timeline;

pub use self::image::{CacheKey, ImageSource, LoadedImage};
pub use timeline::{PostAuthor, TimelineEntry, TimelineRow};
