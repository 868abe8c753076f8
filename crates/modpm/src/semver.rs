//! Semantic version handling
//!
//! Mod packages are versioned with strict `MAJOR.MINOR.PATCH` triples. The
//! repository never serves ranges or pre-release tags, so there is no
//! constraint grammar here: versions are either pinned exactly or resolved
//! to the latest published triple.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during version parsing
#[derive(Debug, Error)]
pub enum SemverError {
    /// Invalid version format
    #[error("Invalid version format: expected MAJOR.MINOR.PATCH, got '{0}'")]
    InvalidVersion(String),
}

/// Semantic version (MAJOR.MINOR.PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string
    ///
    /// Accepts exactly three dot-separated decimal components. Anything
    /// else (missing components, signs, prefixes, pre-release tags) is
    /// rejected.
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(SemverError::InvalidVersion(s.to_string()));
        }

        let major = parse_component(parts[0]).ok_or_else(|| to_error(s))?;
        let minor = parse_component(parts[1]).ok_or_else(|| to_error(s))?;
        let patch = parse_component(parts[2]).ok_or_else(|| to_error(s))?;

        Ok(Version {
            major,
            minor,
            patch,
        })
    }

    /// Check whether a string is a well-formed version triple
    pub fn is_triple(s: &str) -> bool {
        Self::parse(s).is_ok()
    }
}

fn to_error(s: &str) -> SemverError {
    SemverError::InvalidVersion(s.to_string())
}

/// Parse one version component, rejecting empty strings and sign prefixes
/// that `u64::from_str` would otherwise tolerate.
fn parse_component(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.minor.cmp(&other.minor) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.patch.cmp(&other.patch)
    }
}

// Versions travel as strings in every wire document and in the profile
// record, so they serialize through Display/parse.
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
    }

    #[test]
    fn test_parse_rejects_short_triple() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("1").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_long_triple() {
        assert!(Version::parse("1.2.3.4").is_err());
    }

    #[test]
    fn test_parse_rejects_prefixes_and_signs() {
        assert!(Version::parse("v1.2.3").is_err());
        assert!(Version::parse("+1.2.3").is_err());
        assert!(Version::parse("1.-2.3").is_err());
        assert!(Version::parse("1.2.3-alpha").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_components() {
        assert!(Version::parse("1..3").is_err());
        assert!(Version::parse(".2.3").is_err());
        assert!(Version::parse("1.2.").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(1, 0, 0) < Version::new(2, 0, 0));
        assert!(Version::new(1, 2, 0) < Version::new(1, 3, 0));
        assert!(Version::new(1, 2, 3) < Version::new(1, 2, 4));
        assert!(Version::new(1, 2, 3) == Version::new(1, 2, 3));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }

    #[test]
    fn test_display_roundtrip() {
        let v = Version::new(10, 0, 7);
        assert_eq!(Version::parse(&v.to_string()).unwrap(), v);
    }

    #[test]
    fn test_is_triple() {
        assert!(Version::is_triple("0.0.1"));
        assert!(!Version::is_triple("1.2"));
        assert!(!Version::is_triple("name"));
    }

    #[test]
    fn test_serde_as_string() {
        let v: Version = serde_json::from_str("\"1.2.3\"").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.2.3\"");
        assert!(serde_json::from_str::<Version>("\"1.2\"").is_err());
    }
}
