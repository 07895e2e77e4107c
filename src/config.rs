use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, StoreError};
use crate::store::Store;

/// File name of the preference document in the user's home directory
pub const CONFIG_FILENAME: &str = ".podcastrc";

/// User preferences, read once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection string
    pub db: String,
}

/// Where the episode database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Interpret a connection string.
    ///
    /// Accepts a plain path, `:memory:`, or an SQLAlchemy-style URL where
    /// `sqlite:///podcasts.db` is relative and `sqlite:////home/me/podcasts.db`
    /// is absolute. A bare `sqlite://` is an in-memory database.
    pub fn parse(location: &str) -> Result<Self, ConfigError> {
        let location = location.trim();

        let path = if location == "sqlite://" {
            ":memory:"
        } else if let Some(rest) = location.strip_prefix("sqlite:///") {
            rest
        } else if location.contains("://") {
            return Err(ConfigError::UnsupportedStore(location.to_string()));
        } else {
            location
        };

        match path {
            "" => Err(ConfigError::UnsupportedStore(location.to_string())),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    pub fn open(&self) -> Result<Store, StoreError> {
        match self {
            Self::File(path) => Store::open(path),
            Self::Memory => Store::open_in_memory(),
        }
    }
}

impl Config {
    /// Default location of the preference document: `~/.podcastrc`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILENAME))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(&Self::default_path()?),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn store_location(&self) -> Result<StoreLocation, ConfigError> {
        StoreLocation::parse(&self.db)
    }
}
