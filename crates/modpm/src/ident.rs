//! Package identifier parsing
//!
//! A user-supplied identifier is either a filesystem path to a local mod
//! archive, or a `namespace-name[-version]` reference into the remote
//! repository. The split is done with an explicit token grammar rather than
//! one large pattern: tokenize on hyphens, peel a trailing strict version
//! triple if present, take the last remaining token as the name, and
//! re-join everything before it as the namespace. Namespaces may therefore
//! contain hyphens; names never do.

use crate::semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while classifying an identifier
#[derive(Debug, Error)]
pub enum IdentError {
    /// The input is neither an existing archive path nor a well-formed
    /// package reference. Fatal to the whole operation; this is a usage
    /// error, not something to retry.
    #[error("Invalid package identifier '{0}': expected a path to an archive or namespace-name[-version]")]
    InvalidIdentifier(String),
}

/// A structured reference to a package in the remote repository.
///
/// The identity key is `namespace-name`; a missing version means "resolve
/// to latest". Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageReference {
    pub namespace: String,
    pub name: String,
    pub version: Option<Version>,
}

/// A classified user-supplied identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageIdent {
    /// Path to an existing archive on disk
    LocalArchive(PathBuf),
    /// Reference to be resolved against the repository
    Remote(PackageReference),
}

impl PackageReference {
    pub fn new(namespace: &str, name: &str, version: Option<Version>) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version,
        }
    }

    /// Parse a `namespace-name[-version]` token sequence
    pub fn parse(s: &str) -> Result<Self, IdentError> {
        let invalid = || IdentError::InvalidIdentifier(s.to_string());

        let tokens: Vec<&str> = s.split('-').collect();

        // A trailing strict triple is the version; a malformed triple like
        // "1.2" is NOT truncated, it falls through and becomes the name.
        let (version, rest) = match tokens.last() {
            Some(last) if Version::is_triple(last) => {
                let version = Version::parse(last).map_err(|_| invalid())?;
                (Some(version), &tokens[..tokens.len() - 1])
            }
            _ => (None, &tokens[..]),
        };

        if rest.len() < 2 {
            return Err(invalid());
        }

        let name = rest[rest.len() - 1];
        let namespace_tokens = &rest[..rest.len() - 1];

        if !is_word_token(name) || !namespace_tokens.iter().all(|t| is_word_token(t)) {
            return Err(invalid());
        }

        Ok(Self {
            namespace: namespace_tokens.join("-"),
            name: name.to_string(),
            version,
        })
    }

    /// Identity key: `namespace-name`
    pub fn key(&self) -> String {
        format!("{}-{}", self.namespace, self.name)
    }

    /// Full rendering: `namespace-name[-version]`
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "-{}", version)?;
        }
        Ok(())
    }
}

// Dependency lists travel as `namespace-name-version` string tokens in
// manifests and API documents; references serialize through that form.
impl Serialize for PackageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PackageReference::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl PackageIdent {
    /// Classify a user-supplied identifier string
    pub fn parse(s: &str) -> Result<Self, IdentError> {
        let path = Path::new(s);
        if path.is_file() {
            return Ok(PackageIdent::LocalArchive(path.to_path_buf()));
        }

        PackageReference::parse(s).map(PackageIdent::Remote)
    }
}

/// A single word token: ASCII alphanumerics, underscores, and dots. Names
/// must be exactly one of these; namespaces are one or more joined by
/// hyphens.
fn is_word_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}
