//! Image reference resolution
//!
//! An image reference is `<repository-base>/<image-name>:<tag>`. The
//! repository base is fully determined by the cluster version (via the
//! catalog); the tag is whatever the caller supplies, revision suffixes
//! (`-revN`) included. The resolver concatenates, nothing more: tag
//! semantics belong to the caller.

use crate::error::AddonError;
use skipper_kubernetes::{ClusterVersion, VersionCatalog};
use std::sync::Arc;

/// Resolves fully-qualified image references against a version catalog
#[derive(Debug, Clone)]
pub struct ImageResolver {
    catalog: Arc<VersionCatalog>,
}

impl ImageResolver {
    pub fn new(catalog: Arc<VersionCatalog>) -> Self {
        ImageResolver { catalog }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Fully-qualified reference for an addon image
    ///
    /// Fails with `UnsupportedVersion` when the cluster version is not in
    /// the catalog; no partial reference is produced.
    pub fn resolve(
        &self,
        version: &ClusterVersion,
        image_name: &str,
        tag: &str,
    ) -> Result<String, AddonError> {
        let base = self.catalog.repository_base(version)?;
        Ok(format!("{base}/{image_name}:{tag}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ImageResolver {
        ImageResolver::new(Arc::new(VersionCatalog::builtin()))
    }

    #[test]
    fn resolves_for_every_supported_version() {
        let resolver = resolver();
        for ver in resolver.catalog().available_versions() {
            let base = resolver.catalog().repository_base(&ver).unwrap().to_string();
            for tag in ["1.7.5", "1.7.5-rev2"] {
                let got = resolver.resolve(&ver, "cilium", tag).unwrap();
                assert_eq!(got, format!("{base}/cilium:{tag}"));
            }
        }
    }

    #[test]
    fn tag_is_passed_through_verbatim() {
        let resolver = resolver();
        let ver = resolver.catalog().available_versions().next().unwrap();
        // Not a shape the resolver should care about
        let got = resolver.resolve(&ver, "kured", "weird-TAG_1").unwrap();
        assert!(got.ends_with("/kured:weird-TAG_1"));
    }

    #[test]
    fn unsupported_version_produces_no_reference() {
        let resolver = resolver();
        let bogus = ClusterVersion::new(9, 9, 9);
        match resolver.resolve(&bogus, "cilium", "1.7.5") {
            Err(AddonError::UnsupportedVersion(_)) => {}
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn matches_documented_wire_format() {
        let catalog = VersionCatalog::from_entries([(
            ClusterVersion::new(1, 18, 10),
            "reg/v1.18".to_string(),
        )])
        .unwrap();
        let resolver = ImageResolver::new(Arc::new(catalog));
        let got = resolver
            .resolve(&ClusterVersion::new(1, 18, 10), "cilium-operator", "1.7.5-rev2")
            .unwrap();
        assert_eq!(got, "reg/v1.18/cilium-operator:1.7.5-rev2");
    }
}
