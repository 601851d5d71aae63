//! Version catalog: which cluster versions skipper supports, and where
//! their addon images live
//!
//! The catalog is the single source of truth for the image repository base
//! of a given cluster version. Callers must consult it rather than
//! assembling registry paths by hand. It is constructed once at startup
//! (built-in defaults or a YAML file) and passed around read-only.

use crate::version::ClusterVersion;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Registry used when no catalog file overrides it
const DEFAULT_REGISTRY: &str = "registry.skipper.dev";

/// Errors produced by catalog lookups and loading
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The requested version is not in the supported set
    #[error("unsupported cluster version: {0}")]
    UnsupportedVersion(ClusterVersion),

    /// Catalog file could not be read
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file could not be parsed
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Catalog file declared no versions
    #[error("catalog contains no versions")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    version: ClusterVersion,
    repository: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    versions: Vec<CatalogEntry>,
}

/// Read-only mapping from supported cluster versions to image repository
/// base addresses
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    // Kept sorted ascending by version; lookups binary-search it.
    entries: Vec<(ClusterVersion, String)>,
}

impl VersionCatalog {
    /// Catalog of the versions this build of skipper knows about
    pub fn builtin() -> Self {
        let entries = [
            ClusterVersion::new(1, 17, 13),
            ClusterVersion::new(1, 18, 10),
            ClusterVersion::new(1, 19, 4),
        ]
        .into_iter()
        .map(|v| {
            let repo = format!("{}/v{}", DEFAULT_REGISTRY, v.series());
            (v, repo)
        })
        .collect();

        VersionCatalog { entries }
    }

    /// Build a catalog from explicit (version, repository-base) pairs
    pub fn from_entries(
        entries: impl IntoIterator<Item = (ClusterVersion, String)>,
    ) -> Result<Self, CatalogError> {
        let mut entries: Vec<_> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        entries.sort_by_key(|(v, _)| *v);
        entries.dedup_by_key(|(v, _)| *v);
        Ok(VersionCatalog { entries })
    }

    /// Load a catalog from YAML:
    ///
    /// ```yaml
    /// versions:
    ///   - version: 1.18.10
    ///     repository: registry.example.com/v1.18
    /// ```
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_reader(reader)?;
        Self::from_entries(file.versions.into_iter().map(|e| (e.version, e.repository)))
    }

    /// Load a catalog from a YAML file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// The supported versions, ascending
    pub fn available_versions(&self) -> impl Iterator<Item = ClusterVersion> + '_ {
        self.entries.iter().map(|(v, _)| *v)
    }

    /// Highest supported version
    pub fn latest_version(&self) -> ClusterVersion {
        // builtin and from_entries never produce an empty catalog
        self.entries[self.entries.len() - 1].0
    }

    /// Image repository base address for a supported cluster version
    pub fn repository_base(&self, version: &ClusterVersion) -> Result<&str, CatalogError> {
        self.entries
            .binary_search_by_key(version, |(v, _)| *v)
            .map(|idx| self.entries[idx].1.as_str())
            .map_err(|_| CatalogError::UnsupportedVersion(*version))
    }

    /// Whether the catalog knows this version
    pub fn supports(&self, version: &ClusterVersion) -> bool {
        self.entries
            .binary_search_by_key(version, |(v, _)| *v)
            .is_ok()
    }
}
