//! Repository HTTP client
//!
//! Thin blocking wrapper around the remote metadata API. Metadata calls
//! are read-only GETs returning JSON documents; any non-2xx response is a
//! fatal fetch error for the current operation, with no retries at
//! this layer.

use super::api::{PackageMetadataDocument, PackageVersionDocument};
use crate::semver::Version;
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

/// Default repository URL
pub const DEFAULT_REPOSITORY: &str = "https://repo.modpm.dev/api/v1";

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Package not found
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// Version not found
    #[error("Version {version} not found for package {package}")]
    VersionNotFound { package: String, version: String },

    /// Repository unavailable or misbehaving
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Invalid repository URL
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),
}

/// Read-only access to repository metadata.
///
/// The production implementation is [`RegistryClient`]; tests substitute
/// in-memory fakes so resolution can run without a network.
pub trait Registry {
    /// Get package metadata, including its latest version document
    fn get_package(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PackageMetadataDocument, RegistryError>;

    /// Get the metadata document for one specific version
    fn get_version(
        &self,
        namespace: &str,
        name: &str,
        version: &Version,
    ) -> Result<PackageVersionDocument, RegistryError>;
}

/// Client for the remote package repository
pub struct RegistryClient {
    /// HTTP client
    client: Client,

    /// Base URL for the repository
    base_url: String,
}

impl RegistryClient {
    /// Create a client for a repository URL
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        url::Url::parse(base_url).map_err(|_| RegistryError::InvalidUrl(base_url.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("modpm/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Registry for RegistryClient {
    /// GET /package/{namespace}/{name}
    fn get_package(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PackageMetadataDocument, RegistryError> {
        let url = format!("{}/package/{}/{}", self.base_url, namespace, name);

        let response = self.client.get(&url).send()?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::PackageNotFound(format!(
                "{}-{}",
                namespace, name
            )));
        }

        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "Repository returned status {}",
                response.status()
            )));
        }

        let document: PackageMetadataDocument = response.json()?;
        Ok(document)
    }

    /// GET /package/{namespace}/{name}/{version}
    fn get_version(
        &self,
        namespace: &str,
        name: &str,
        version: &Version,
    ) -> Result<PackageVersionDocument, RegistryError> {
        let url = format!(
            "{}/package/{}/{}/{}",
            self.base_url, namespace, name, version
        );

        let response = self.client.get(&url).send()?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::VersionNotFound {
                package: format!("{}-{}", namespace, name),
                version: version.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "Repository returned status {}",
                response.status()
            )));
        }

        let document: PackageVersionDocument = response.json()?;
        Ok(document)
    }
}
