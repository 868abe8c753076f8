//! Repository API types
//!
//! Response documents for the remote package repository API.

use crate::ident::PackageReference;
use crate::manifest::PackageManifest;
use crate::semver::Version;
use serde::{Deserialize, Serialize};

/// Package metadata document
///
/// Response from GET /package/{namespace}/{name}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadataDocument {
    /// Owning namespace
    pub namespace: String,

    /// Package name
    pub name: String,

    /// Metadata of the most recently published version
    pub latest_version: PackageVersionDocument,

    /// Communities this package is listed in
    #[serde(default)]
    pub community_listings: Vec<CommunityListing>,
}

/// Package version document
///
/// Response from GET /package/{namespace}/{name}/{version}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersionDocument {
    /// Owning namespace. Some repository deployments omit it on the
    /// version document; the requesting reference supplies it then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Package name
    pub name: String,

    /// Version described by this document
    pub version_number: Version,

    /// Archive download URL
    pub download_url: String,

    /// Size of the archive in bytes
    #[serde(default)]
    pub file_size: u64,

    /// Declared dependencies as `namespace-name-version` tokens
    #[serde(default)]
    pub dependencies: Vec<PackageReference>,

    /// Package owner/author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// One community listing of a package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityListing {
    /// Community identifier
    pub community: String,

    /// Listing categories
    #[serde(default)]
    pub categories: Vec<String>,
}

impl PackageVersionDocument {
    /// Convert into a manifest, backfilling the namespace from the
    /// requesting context when the document omits it.
    pub fn into_manifest(self, fallback_namespace: &str) -> PackageManifest {
        let namespace = self
            .namespace
            .unwrap_or_else(|| fallback_namespace.to_string());

        PackageManifest {
            namespace: Some(namespace),
            name: self.name,
            version_number: self.version_number,
            dependencies: self.dependencies,
            file_size: self.file_size,
            download_url: Some(self.download_url),
            owner: self.owner,
        }
    }
}
