//! Render context for addon manifests
//!
//! A [`RenderContext`] is built once per apply attempt from the addon
//! configuration and exposes ready-to-embed image reference strings per
//! addon image role. It is a pure function of its inputs: no cluster
//! connection is involved and repeated calls yield identical strings.
//! The cluster version picks the repository, each addon's own release
//! version picks the tag.

use crate::cilium;
use crate::error::AddonError;
use crate::images::ImageResolver;
use crate::kured;
use crate::AddonConfiguration;

/// Per-invocation rendering context
#[derive(Debug, Clone)]
pub struct RenderContext {
    config: AddonConfiguration,
    resolver: ImageResolver,
}

impl RenderContext {
    pub fn new(config: AddonConfiguration, resolver: ImageResolver) -> Self {
        RenderContext { config, resolver }
    }

    pub fn config(&self) -> &AddonConfiguration {
        &self.config
    }

    /// Control-plane endpoint for manifests that need to dial home
    pub fn control_plane(&self) -> &str {
        &self.config.control_plane
    }

    pub fn cluster_name(&self) -> &str {
        &self.config.cluster_name
    }

    /// Reference for an arbitrary image role; addon accessors funnel here
    pub fn image(&self, image_name: &str, tag: &str) -> Result<String, AddonError> {
        self.resolver
            .resolve(&self.config.cluster_version, image_name, tag)
    }

    /// Cilium init container image
    pub fn cilium_init_image(&self) -> Result<String, AddonError> {
        self.image(cilium::INIT_IMAGE_NAME, cilium::VERSION)
    }

    /// Cilium operator image
    pub fn cilium_operator_image(&self) -> Result<String, AddonError> {
        self.image(cilium::OPERATOR_IMAGE_NAME, cilium::VERSION)
    }

    /// Cilium agent image
    pub fn cilium_image(&self) -> Result<String, AddonError> {
        self.image(cilium::IMAGE_NAME, cilium::VERSION)
    }

    /// Kured daemon image
    pub fn kured_image(&self) -> Result<String, AddonError> {
        self.image(kured::IMAGE_NAME, kured::VERSION)
    }
}
