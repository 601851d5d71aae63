//! Kured reboot-daemon addon
//!
//! Unlike a CNI, kured has no hard dependency on prior skipper state: it
//! can be applied to any supported cluster. Its hooks are correspondingly
//! lighter than cilium's.

use crate::addon::{Addon, AddonCallbacks, AddonConfiguration};
use crate::error::AddonError;
use crate::render::RenderContext;
use async_trait::async_trait;
use serde_json::json;
use skipper_kubernetes::{ClusterClient, ClusterConfiguration};

/// Kured release shipped with this build of skipper
pub const VERSION: &str = "1.4.4";

pub const IMAGE_NAME: &str = "kured";

const NAMESPACE: &str = "kube-system";

#[derive(Debug, Default)]
pub struct KuredAddon {
    callbacks: KuredCallbacks,
}

impl Addon for KuredAddon {
    fn name(&self) -> &str {
        "kured"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn manifests(&self, ctx: &RenderContext) -> Result<Vec<serde_json::Value>, AddonError> {
        let image = ctx.kured_image()?;

        let daemon_set = json!({
            "apiVersion": "apps/v1",
            "kind": "DaemonSet",
            "metadata": {
                "name": "kured",
                "namespace": NAMESPACE,
                "labels": { "k8s-app": "kured" },
            },
            "spec": {
                "selector": { "matchLabels": { "k8s-app": "kured" } },
                "template": {
                    "metadata": { "labels": { "k8s-app": "kured" } },
                    "spec": {
                        "hostPID": true,
                        "tolerations": [ {
                            "key": "node-role.kubernetes.io/master",
                            "effect": "NoSchedule",
                        } ],
                        "containers": [ {
                            "name": "kured",
                            "image": image,
                            "securityContext": { "privileged": true },
                            "command": ["/usr/bin/kured", "--period=1h"],
                        } ],
                    },
                },
            },
        });

        Ok(vec![daemon_set])
    }

    fn callbacks(&self) -> &dyn AddonCallbacks {
        &self.callbacks
    }
}

#[derive(Debug, Default)]
pub struct KuredCallbacks;

#[async_trait]
impl AddonCallbacks for KuredCallbacks {
    async fn before_apply(
        &self,
        _client: &dyn ClusterClient,
        _config: &AddonConfiguration,
        _prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError> {
        // No preconditions beyond a supported cluster version, which the
        // rendering step already enforces.
        Ok(())
    }

    async fn after_apply(
        &self,
        client: &dyn ClusterClient,
        _config: &AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<(), AddonError> {
        // Record the applied version when a snapshot exists; kured does not
        // require one, so absence is not an error here.
        if let Some(prior) = prior {
            let mut updated = prior.clone();
            updated.set_addon_version("kured", VERSION);
            updated.store(client).await?;
            tracing::info!(version = VERSION, "recorded applied kured version");
        } else {
            tracing::debug!("no stored configuration; skipping kured version record");
        }
        Ok(())
    }
}
