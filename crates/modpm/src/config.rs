//! Client configuration
//!
//! Configuration lives in `~/.modpm/config.toml`; every field is optional
//! and falls back to a sensible default. The loaded [`Config`] is carried
//! inside an explicit [`Context`] together with the repository client and
//! the download cache, so components receive the context they need rather
//! than reaching for process-wide state.

use crate::cache::{CacheError, DownloadCache, HttpArchiveFetcher};
use crate::profile::GameDefinition;
use crate::registry::{RegistryClient, RegistryError, DEFAULT_REPOSITORY};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file exists but is not valid TOML
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    NoHome,

    /// No install directory known for a game
    #[error("Unknown game '{0}': add it to the [games] table or pass --game-dir")]
    UnknownGame(String),

    /// Repository client could not be constructed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Download cache could not be opened
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// On-disk config file shape; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    repository_url: Option<String>,
    cache_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    installer: Option<PathBuf>,
    games: HashMap<String, PathBuf>,
}

/// Effective client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository metadata API base URL
    pub repository_url: String,

    /// Archive cache root
    pub cache_dir: PathBuf,

    /// Root for profiles and other durable state
    pub data_dir: PathBuf,

    /// External installer executable
    pub installer: PathBuf,

    /// Game identifier → install directory
    pub games: HashMap<String, PathBuf>,
}

impl Config {
    /// Load configuration from the default root (`~/.modpm`)
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
        Self::load_from(&home.join(".modpm"))
    }

    /// Load configuration from an explicit root directory
    pub fn load_from(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("config.toml");
        let file: ConfigFile = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            ConfigFile::default()
        };

        Ok(Self {
            repository_url: file
                .repository_url
                .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string()),
            cache_dir: file.cache_dir.unwrap_or_else(|| root.join("cache")),
            data_dir: file.data_dir.unwrap_or_else(|| root.to_path_buf()),
            installer: file
                .installer
                .unwrap_or_else(|| PathBuf::from("modpm-install")),
            games: file.games,
        })
    }

    /// Resolve a game definition, preferring an explicit directory over
    /// the configured one
    pub fn game(
        &self,
        identifier: &str,
        override_dir: Option<PathBuf>,
    ) -> Result<GameDefinition, ConfigError> {
        let install_dir = override_dir
            .or_else(|| self.games.get(identifier).cloned())
            .ok_or_else(|| ConfigError::UnknownGame(identifier.to_string()))?;

        Ok(GameDefinition {
            identifier: identifier.to_string(),
            install_dir,
        })
    }

    /// Root directory for persisted profiles
    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }
}

/// Everything a command needs to run, constructed once at startup
pub struct Context {
    pub config: Config,
    pub registry: RegistryClient,
    pub cache: DownloadCache,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let registry = RegistryClient::new(&config.repository_url)?;
        let fetcher = HttpArchiveFetcher::new().map_err(RegistryError::Http)?;
        let cache = DownloadCache::new(config.cache_dir.clone(), Arc::new(fetcher))?;

        Ok(Self {
            config,
            registry,
            cache,
        })
    }
}
