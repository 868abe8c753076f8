//! Game and profile state
//!
//! A profile is a named, isolated mod installation context for one game
//! installation. Its `installed` mapping is the durable record of which
//! package version is installed, the sole source of truth the resolver
//! and orchestrator consult. The mapping is mutated in memory as installs
//! succeed and written back atomically by the command layer.

use crate::manifest::PackageManifest;
use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during profile persistence
#[derive(Debug, Error)]
pub enum ProfileError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile file exists but could not be parsed
    #[error("Failed to parse profile file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A target game installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Stable identifier, e.g. `riskofrain2`
    pub identifier: String,

    /// Game installation directory handed to the installer
    pub install_dir: PathBuf,
}

/// A mod profile for one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModProfile {
    /// Profile name
    pub name: String,

    /// Directory the installer places this profile's files into
    pub directory: PathBuf,

    /// Installed package versions, keyed `namespace-name`
    #[serde(default)]
    pub installed: BTreeMap<String, PackageManifest>,
}

impl ModProfile {
    pub fn new(name: &str, directory: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            directory,
            installed: BTreeMap::new(),
        }
    }

    /// Check whether a package key is recorded as installed
    pub fn is_installed(&self, key: &str) -> bool {
        self.installed.contains_key(key)
    }

    /// Version recorded for a key, if any
    pub fn installed_version(&self, key: &str) -> Option<Version> {
        self.installed.get(key).map(|m| m.version_number)
    }

    /// Record a successful install, replacing any prior entry for the key
    pub fn record_install(&mut self, key: String, manifest: PackageManifest) {
        self.installed.insert(key, manifest);
    }

    /// Drop a package from the record
    pub fn remove(&mut self, key: &str) -> Option<PackageManifest> {
        self.installed.remove(key)
    }
}

/// Loads and persists profiles under a root directory, one JSON file per
/// profile: `<root>/<game>/<profile>.json`, with the profile's mod
/// directory alongside at `<root>/<game>/<profile>/`.
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Path of a profile's state file
    pub fn profile_path(&self, game: &str, profile: &str) -> PathBuf {
        self.root.join(game).join(format!("{}.json", profile))
    }

    /// Load a profile, or create a fresh one if none was persisted yet.
    ///
    /// The profile's mod directory is created so the installer always has
    /// a target to work with.
    pub fn load(&self, game: &GameDefinition, name: &str) -> Result<ModProfile, ProfileError> {
        let directory = self.root.join(&game.identifier).join(name);
        fs::create_dir_all(&directory)?;

        let path = self.profile_path(&game.identifier, name);
        if !path.exists() {
            return Ok(ModProfile::new(name, directory));
        }

        let contents = fs::read_to_string(&path)?;
        let profile = serde_json::from_str(&contents).map_err(|source| ProfileError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(profile)
    }

    /// Persist a profile atomically (staging file, then rename).
    ///
    /// Only called by the command layer once the operation has progress
    /// worth keeping; a failed run that installed nothing leaves the prior
    /// on-disk state authoritative.
    pub fn persist(&self, game: &GameDefinition, profile: &ModProfile) -> Result<(), ProfileError> {
        let path = self.profile_path(&game.identifier, &profile.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(profile).map_err(|source| {
            ProfileError::Parse {
                path: path.display().to_string(),
                source,
            }
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
