//! Cilium CNI addon
//!
//! Renders the cilium agent DaemonSet, operator Deployment and supporting
//! objects with image references resolved against the version catalog.
//! `before_apply` refuses to run against a cluster skipper has no record
//! of, and against a cluster that already runs a different CNI.

use crate::addon::{Addon, AddonCallbacks, AddonConfiguration};
use crate::error::AddonError;
use crate::render::RenderContext;
use async_trait::async_trait;
use serde_json::json;
use skipper_kubernetes::{ClusterClient, ClusterConfiguration};

/// Cilium release shipped with this build of skipper
pub const VERSION: &str = "1.7.5";

pub const IMAGE_NAME: &str = "cilium";
pub const INIT_IMAGE_NAME: &str = "cilium-init";
pub const OPERATOR_IMAGE_NAME: &str = "cilium-operator";

const NAMESPACE: &str = "kube-system";

/// Label selectors identifying other CNI daemons we would conflict with
const CONFLICTING_CNI_SELECTORS: &[(&str, &str)] = &[
    ("flannel", "app=flannel"),
    ("calico", "k8s-app=calico-node"),
    ("weave", "name=weave-net"),
];

#[derive(Debug, Default)]
pub struct CiliumAddon {
    callbacks: CiliumCallbacks,
}

impl Addon for CiliumAddon {
    fn name(&self) -> &str {
        "cilium"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn manifests(&self, ctx: &RenderContext) -> Result<Vec<serde_json::Value>, AddonError> {
        let init_image = ctx.cilium_init_image()?;
        let operator_image = ctx.cilium_operator_image()?;
        let agent_image = ctx.cilium_image()?;

        let service_account = json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": { "name": "cilium", "namespace": NAMESPACE },
        });

        let config = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cilium-config", "namespace": NAMESPACE },
            "data": {
                "cluster-name": ctx.cluster_name(),
                "k8s-api-server": ctx.control_plane(),
                "tunnel": "vxlan",
                "enable-ipv4": "true",
            },
        });

        let agent = json!({
            "apiVersion": "apps/v1",
            "kind": "DaemonSet",
            "metadata": {
                "name": "cilium",
                "namespace": NAMESPACE,
                "labels": { "k8s-app": "cilium" },
            },
            "spec": {
                "selector": { "matchLabels": { "k8s-app": "cilium" } },
                "template": {
                    "metadata": { "labels": { "k8s-app": "cilium" } },
                    "spec": {
                        "serviceAccountName": "cilium",
                        "hostNetwork": true,
                        "tolerations": [ { "operator": "Exists" } ],
                        "initContainers": [ {
                            "name": "install-cni",
                            "image": init_image,
                        } ],
                        "containers": [ {
                            "name": "cilium-agent",
                            "image": agent_image,
                            "securityContext": {
                                "capabilities": {
                                    "add": ["NET_ADMIN", "SYS_MODULE"],
                                },
                            },
                        } ],
                    },
                },
            },
        });

        let operator = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "cilium-operator",
                "namespace": NAMESPACE,
                "labels": { "k8s-app": "cilium-operator" },
            },
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": { "k8s-app": "cilium-operator" } },
                "template": {
                    "metadata": { "labels": { "k8s-app": "cilium-operator" } },
                    "spec": {
                        "serviceAccountName": "cilium",
                        "containers": [ {
                            "name": "cilium-operator",
                            "image": operator_image,
                        } ],
                    },
                },
            },
        });

        Ok(vec![service_account, config, agent, operator])
    }

    fn callbacks(&self) -> &dyn AddonCallbacks {
        &self.callbacks
    }
}

#[derive(Debug, Default)]
pub struct CiliumCallbacks;

#[async_trait]
impl AddonCallbacks for CiliumCallbacks {
    async fn before_apply(
        &self,
        client: &dyn ClusterClient,
        config: &AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError> {
        // A CNI must never be pushed onto a cluster whose state we do not
        // know; the stored configuration is the proof skipper set it up.
        let Some(prior) = prior else {
            return Err(AddonError::PreconditionFailed(
                "no stored cluster configuration found; \
                 refusing to apply cilium to an unknown cluster"
                    .to_string(),
            ));
        };

        if prior.kubernetes_version.major != config.cluster_version.major {
            return Err(AddonError::PreconditionFailed(format!(
                "cluster was bootstrapped at {} but apply targets {}",
                prior.kubernetes_version, config.cluster_version,
            )));
        }

        for (name, selector) in CONFLICTING_CNI_SELECTORS {
            let pods = client.list_pod_names(NAMESPACE, selector).await?;
            if !pods.is_empty() {
                return Err(AddonError::PreconditionFailed(format!(
                    "conflicting CNI {name} is running in {NAMESPACE} ({} pods)",
                    pods.len(),
                )));
            }
        }

        Ok(())
    }

    async fn after_apply(
        &self,
        client: &dyn ClusterClient,
        _config: &AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError> {
        // before_apply guarantees prior is present for cilium
        let Some(prior) = prior else {
            return Err(AddonError::ReconcileFailure(
                "stored cluster configuration disappeared during apply".to_string(),
            ));
        };

        let mut updated = prior.clone();
        updated.set_addon_version("cilium", VERSION);
        updated.store(client).await?;
        tracing::info!(version = VERSION, "recorded applied cilium version");
        Ok(())
    }
}
