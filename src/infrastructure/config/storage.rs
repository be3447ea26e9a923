//! Location and persistence of the `avatar-cache` config file.
//!
//! The file lives at `<config dir>/config.toml`, where the config dir comes
//! from [`ProjectDirs`] unless `--config` points elsewhere. A first run
//! writes the defaults out so the cache directory and fetch settings are
//! discoverable and editable.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::AppConfig;
use crate::{APP_ORGANIZATION, APP_QUALIFIER, NAME};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Failures while locating, reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform exposes no home or config directory.
    #[error("no config directory available for {NAME}")]
    ConfigDirNotFound,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The default config could not be rendered as TOML.
    #[error("failed to render config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Owns the directory holding `config.toml`.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Uses the platform config directory for `avatar-cache`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigDirNotFound`] if the platform has none.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    /// Uses `path` as the config directory.
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Returns the config directory.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the config file path, honouring an explicit `--config` path.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf)
    }

    /// Creates the config directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> Result<(), ConfigError> {
        if !self.config_dir.exists() {
            info!(path = %self.config_dir.display(), "Creating config directory");
            fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Reads the fetcher configuration.
    ///
    /// A missing file is written out with defaults. A file that does not
    /// parse is left as is and defaults are used, so a typo never keeps
    /// avatars from loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or the defaults
    /// cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        self.ensure_config_dir()?;
        let config_path = self.config_path(path_override);

        if !config_path.exists() {
            info!(path = %config_path.display(), "No config file, writing defaults");
            let config = AppConfig::default();
            write_config(&config_path, &config)?;
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => {
                debug!(path = %config_path.display(), "Loaded config");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "Config file is malformed, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("config path has no parent directory"))?;
    fs::create_dir_all(parent)?;
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
