//! avatar-cache - Avatar fetching and caching for a microblogging timeline client.
//!
//! Resolves avatar URLs to normalized RGBA images through a content-addressed
//! disk cache, falling back to an embedded placeholder on any failure.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases.
pub mod application;
/// Domain layer containing entities and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "avatar-cache";

/// Qualifier used to locate platform directories.
pub const APP_QUALIFIER: &str = "com";

/// Organization used to locate platform directories.
pub const APP_ORGANIZATION: &str = "linuxmobile";
