//! Addon trait, lifecycle callbacks and the registry
//!
//! Each addon is a variant of the same capability set: it declares its own
//! release version, renders its manifest set from a [`RenderContext`], and
//! supplies lifecycle hooks. New addons register into [`AddonRegistry`]
//! without touching the engine.

use crate::error::AddonError;
use crate::render::RenderContext;
use async_trait::async_trait;
use skipper_kubernetes::{ClusterClient, ClusterConfiguration, ClusterVersion};
use std::collections::BTreeMap;

/// Per-invocation addon apply configuration
///
/// Constructed fresh for each apply attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonConfiguration {
    /// Version of the target control plane; selects the image repository
    pub cluster_version: ClusterVersion,
    /// Control-plane endpoint manifests may reference
    pub control_plane: String,
    /// Name of the target cluster
    pub cluster_name: String,
}

/// Ordered lifecycle hooks around the apply step
///
/// `before_apply` validates that the cluster is in a state this addon can
/// be applied to. It may read from the cluster but must not mutate it;
/// mutation belongs to the apply step and `after_apply`. Addons that
/// depend on prior skipper state must fail when `prior` is `None`:
/// applying onto an unknown cluster state is never acceptable.
#[async_trait]
pub trait AddonCallbacks: Send + Sync {
    async fn before_apply(
        &self,
        client: &dyn ClusterClient,
        config: &AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError>;

    async fn after_apply(
        &self,
        client: &dyn ClusterClient,
        config: &AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError>;
}

/// A deployable cluster addon
pub trait Addon: Send + Sync {
    /// Registry name, e.g. "cilium"
    fn name(&self) -> &str;

    /// The addon's own release tag (not the cluster version)
    fn version(&self) -> &str;

    /// Render the manifest documents to apply, images already embedded
    fn manifests(&self, ctx: &RenderContext) -> Result<Vec<serde_json::Value>, AddonError>;

    /// Lifecycle hooks for this addon
    fn callbacks(&self) -> &dyn AddonCallbacks;
}

/// Name-keyed set of known addons
pub struct AddonRegistry {
    addons: BTreeMap<String, Box<dyn Addon>>,
}

impl AddonRegistry {
    pub fn empty() -> Self {
        AddonRegistry {
            addons: BTreeMap::new(),
        }
    }

    /// Registry with every addon this build of skipper ships
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(crate::cilium::CiliumAddon::default()));
        registry.register(Box::new(crate::kured::KuredAddon::default()));
        registry
    }

    pub fn register(&mut self, addon: Box<dyn Addon>) {
        self.addons.insert(addon.name().to_string(), addon);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Addon, AddonError> {
        self.addons
            .get(name)
            .map(|a| a.as_ref())
            .ok_or_else(|| AddonError::UnknownAddon(name.to_string()))
    }

    /// Registered addon names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.addons.keys().map(|s| s.as_str())
    }
}
