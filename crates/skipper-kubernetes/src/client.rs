//! Cluster client abstraction
//!
//! The addon engine only needs a narrow slice of the Kubernetes API:
//! read ConfigMaps and pods during validation, and server-side apply
//! rendered manifests. [`ClusterClient`] captures that slice so the engine
//! stays testable without a live cluster; [`KubeClusterClient`] is the
//! production implementation over `kube::Client`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams};
use kube::discovery::{self, Scope};
use kube::core::GroupVersionKind;
use std::collections::BTreeMap;

/// Field manager skipper registers for server-side apply
pub const FIELD_MANAGER: &str = "skipper";

/// Errors from cluster reads and writes
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Kubernetes API call failed
    #[error("kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Manifest document is not a valid Kubernetes object
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Injected by test doubles to simulate a failing cluster
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// The cluster operations the addon engine consumes
///
/// `before_apply` hooks may only use the read methods; mutation is reserved
/// for the apply step and `after_apply`.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read a ConfigMap's data, `None` if it does not exist
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClientError>;

    /// Names of pods in a namespace matching a label selector
    async fn list_pod_names(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<String>, ClientError>;

    /// Server-side apply one manifest document
    async fn apply_manifest(&self, manifest: &serde_json::Value) -> Result<(), ClientError>;

    /// Create or update a ConfigMap with the given data
    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<(), ClientError>;
}

/// Production client backed by `kube::Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: kube::Client,
}

impl KubeClusterClient {
    pub fn new(client: kube::Client) -> Self {
        KubeClusterClient { client }
    }

    /// Resolve a manifest's API resource and return a dynamic Api scoped to
    /// the object's namespace (or cluster-wide for cluster-scoped kinds)
    async fn dynamic_api(
        &self,
        obj: &DynamicObject,
    ) -> Result<Api<DynamicObject>, ClientError> {
        let types = obj
            .types
            .clone()
            .ok_or_else(|| ClientError::InvalidManifest("missing apiVersion/kind".into()))?;
        let gvk = GroupVersionKind::try_from(types)
            .map_err(|e| ClientError::InvalidManifest(e.to_string()))?;

        let (resource, caps) = discovery::pinned_kind(&self.client, &gvk).await?;

        let api = if caps.scope == Scope::Namespaced {
            let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        } else {
            Api::all_with(self.client.clone(), &resource)
        };
        Ok(api)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClientError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        match api.get_opt(name).await? {
            Some(cm) => Ok(Some(cm.data.unwrap_or_default())),
            None => Ok(None),
        }
    }

    async fn list_pod_names(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        let pods = api.list(&params).await?;
        Ok(pods
            .items
            .into_iter()
            .filter_map(|pod| pod.metadata.name)
            .collect())
    }

    async fn apply_manifest(&self, manifest: &serde_json::Value) -> Result<(), ClientError> {
        let obj: DynamicObject = serde_json::from_value(manifest.clone())
            .map_err(|e| ClientError::InvalidManifest(e.to_string()))?;
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| ClientError::InvalidManifest("missing metadata.name".into()))?;

        let api = self.dynamic_api(&obj).await?;
        tracing::debug!(name = %name, "applying manifest");
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&obj),
        )
        .await?;
        Ok(())
    }

    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name, "namespace": namespace },
            "data": data,
        });
        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&patch),
        )
        .await?;
        Ok(())
    }
}
