//! Kubernetes control-plane version identifier
//!
//! Versions are plain `major.minor.patch` triples. They are totally ordered
//! and immutable once constructed; the set of versions skipper actually
//! supports lives in the [`crate::catalog::VersionCatalog`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a version string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cluster version {0:?}: expected major.minor.patch")]
pub struct VersionParseError(pub String);

/// A Kubernetes control-plane release version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ClusterVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        ClusterVersion {
            major,
            minor,
            patch,
        }
    }

    /// The `major.minor` series this version belongs to, e.g. "1.18"
    pub fn series(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ClusterVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Tolerate the common "v" prefix from kubeadm / kubectl output
        let trimmed = s.strip_prefix('v').unwrap_or(s);

        let mut parts = trimmed.splitn(3, '.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| VersionParseError(s.to_string()))
        };

        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(ClusterVersion::new(major, minor, patch))
    }
}

impl Serialize for ClusterVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClusterVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_v_prefixed() {
        let ver: ClusterVersion = "1.18.10".parse().unwrap();
        assert_eq!(ver, ClusterVersion::new(1, 18, 10));

        let ver: ClusterVersion = "v1.17.13".parse().unwrap();
        assert_eq!(ver, ClusterVersion::new(1, 17, 13));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "1.18", "1.18.x", "one.two.three", "1.18.10.4junk"] {
            assert!(bad.parse::<ClusterVersion>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_round_trips() {
        let ver = ClusterVersion::new(1, 18, 10);
        assert_eq!(ver.to_string(), "1.18.10");
        assert_eq!(ver.to_string().parse::<ClusterVersion>().unwrap(), ver);
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let older = ClusterVersion::new(1, 9, 2);
        let newer = ClusterVersion::new(1, 18, 0);
        assert!(older < newer);
    }

    #[test]
    fn series_drops_patch() {
        assert_eq!(ClusterVersion::new(1, 18, 10).series(), "1.18");
    }

    #[test]
    fn serde_uses_dotted_string() {
        let ver = ClusterVersion::new(1, 17, 13);
        let yaml = serde_yaml::to_string(&ver).unwrap();
        assert_eq!(yaml.trim(), "1.17.13");
        let back: ClusterVersion = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, ver);
    }
}
