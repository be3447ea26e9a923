//! Timeline entries and the rows rendered from them.

use serde::{Deserialize, Serialize};

use super::image::LoadedImage;

/// Author of a timeline post as delivered by the REST API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PostAuthor {
    screen_name: String,
    profile_image_url: String,
}

#[allow(missing_docs)]
impl PostAuthor {
    #[must_use]
    pub fn new(screen_name: impl Into<String>, profile_image_url: impl Into<String>) -> Self {
        Self {
            screen_name: screen_name.into(),
            profile_image_url: profile_image_url.into(),
        }
    }

    #[must_use]
    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    #[must_use]
    pub fn profile_image_url(&self) -> &str {
        &self.profile_image_url
    }
}

/// A single post on the home timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntry {
    #[serde(rename = "id_str")]
    id: String,
    text: String,
    #[serde(rename = "user")]
    author: PostAuthor,
}

impl TimelineEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, author: PostAuthor) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author,
        }
    }

    /// Returns the post id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the post text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the author.
    #[must_use]
    pub const fn author(&self) -> &PostAuthor {
        &self.author
    }

    /// Returns the URL of the author's avatar.
    #[must_use]
    pub fn avatar_url(&self) -> &str {
        self.author.profile_image_url()
    }
}

/// A timeline entry paired with its resolved avatar.
#[derive(Debug, Clone)]
pub struct TimelineRow {
    /// The post.
    pub entry: TimelineEntry,
    /// The author's avatar, or the placeholder.
    pub avatar: LoadedImage,
}
