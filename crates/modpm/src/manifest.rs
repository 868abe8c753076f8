//! Package manifests
//!
//! A manifest describes one package version and its declared dependencies.
//! It is produced either by reading the `manifest.json` entry embedded in a
//! mod archive, or from a repository API document. A local archive's
//! manifest may omit the namespace; it must be backfilled from the
//! resolving context before the manifest is used as an identity, since the
//! profile record and the installer's namespace argument both depend on it.

use crate::ident::PackageReference;
use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the manifest entry inside a mod archive
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Errors that can occur while reading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read the archive file
    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be opened as a zip
    #[error("Failed to open archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive has no manifest entry
    #[error("Archive {0} has no {MANIFEST_ENTRY} entry")]
    Missing(String),

    /// The manifest entry is not valid JSON or has the wrong shape
    #[error("Invalid manifest in {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Metadata for one package version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Owning namespace. Absent in some local archive manifests until
    /// backfilled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Package name
    pub name: String,

    /// Version of this package
    pub version_number: Version,

    /// Declared dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<PackageReference>,

    /// Size of the package archive in bytes (0 when unknown)
    #[serde(default)]
    pub file_size: u64,

    /// Archive download URL. Absent for manifests read out of a local
    /// archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Package owner/author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl PackageManifest {
    /// Read the manifest embedded in a mod archive.
    ///
    /// A missing entry or malformed JSON is fatal for that archive.
    pub fn from_archive(path: &Path) -> Result<Self, ManifestError> {
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let entry = match archive.by_name(MANIFEST_ENTRY) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(ManifestError::Missing(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_reader(entry).map_err(|source| ManifestError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }

    /// Fill in the namespace if the manifest does not carry one
    pub fn backfill_namespace(&mut self, namespace: &str) {
        if self.namespace.is_none() {
            self.namespace = Some(namespace.to_string());
        }
    }

    /// Identity key (`namespace-name`), available once the namespace is
    /// known
    pub fn key(&self) -> Option<String> {
        self.namespace
            .as_ref()
            .map(|ns| format!("{}-{}", ns, self.name))
    }

    /// Full `namespace-name-version` rendering for display
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}-{}-{}", ns, self.name, self.version_number),
            None => format!("{}-{}", self.name, self.version_number),
        }
    }
}
