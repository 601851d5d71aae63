//! Addon apply engine
//!
//! One apply attempt walks a fixed forward-only sequence:
//! Validating -> Rendering -> Applying -> Reconciling -> Done, with Failed
//! reachable from any non-terminal phase. The engine holds no mutable
//! state of its own, so it is safe to run concurrently for different
//! addons or different clusters; serializing writes to one cluster is the
//! caller's job.
//!
//! Failure semantics, deliberately:
//! - a validation failure leaves the cluster untouched;
//! - a mid-apply failure leaves the already-applied manifests in place
//!   (no rollback; re-apply is the recovery path);
//! - a reconcile failure is reported but does not undo the apply.

use crate::addon::{Addon, AddonConfiguration};
use crate::error::AddonError;
use crate::images::ImageResolver;
use crate::render::RenderContext;
use skipper_kubernetes::{ClusterClient, ClusterConfiguration, VersionCatalog};
use std::fmt;
use std::sync::Arc;

/// Phase of one apply attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Validating,
    Rendering,
    Applying,
    Reconciling,
    Done,
    Failed,
}

impl ApplyPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplyPhase::Done | ApplyPhase::Failed)
    }

    /// The phase that follows on success; terminal phases stay put
    pub fn next(&self) -> ApplyPhase {
        match self {
            ApplyPhase::Validating => ApplyPhase::Rendering,
            ApplyPhase::Rendering => ApplyPhase::Applying,
            ApplyPhase::Applying => ApplyPhase::Reconciling,
            ApplyPhase::Reconciling => ApplyPhase::Done,
            ApplyPhase::Done => ApplyPhase::Done,
            ApplyPhase::Failed => ApplyPhase::Failed,
        }
    }
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplyPhase::Validating => "validating",
            ApplyPhase::Rendering => "rendering",
            ApplyPhase::Applying => "applying",
            ApplyPhase::Reconciling => "reconciling",
            ApplyPhase::Done => "done",
            ApplyPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of a successful apply attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub addon: String,
    pub addon_version: String,
    pub manifests_applied: usize,
}

/// Orchestrates addon apply attempts
#[derive(Clone)]
pub struct AddonEngine {
    resolver: ImageResolver,
}

impl AddonEngine {
    pub fn new(catalog: Arc<VersionCatalog>) -> Self {
        AddonEngine {
            resolver: ImageResolver::new(catalog),
        }
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    /// Run one addon through the full lifecycle against a cluster
    pub async fn apply(
        &self,
        client: &dyn ClusterClient,
        addon: &dyn Addon,
        config: AddonConfiguration,
        prior: Option<&ClusterConfiguration>,
    ) -> Result<ApplyOutcome, AddonError> {
        let mut phase = ApplyPhase::Validating;
        tracing::info!(addon = addon.name(), %phase, "starting apply");

        if let Err(err) = addon.callbacks().before_apply(client, &config, prior).await {
            tracing::warn!(addon = addon.name(), %phase, error = %err, "apply failed");
            return Err(err);
        }

        phase = phase.next();
        tracing::debug!(addon = addon.name(), %phase, "preconditions satisfied");

        let ctx = RenderContext::new(config.clone(), self.resolver.clone());
        let manifests = match addon.manifests(&ctx) {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!(addon = addon.name(), %phase, error = %err, "apply failed");
                return Err(err);
            }
        };

        phase = phase.next();
        let total = manifests.len();
        tracing::debug!(addon = addon.name(), %phase, total, "rendered manifests");

        for (applied, manifest) in manifests.iter().enumerate() {
            if let Err(source) = client.apply_manifest(manifest).await {
                tracing::warn!(
                    addon = addon.name(),
                    %phase,
                    applied,
                    total,
                    error = %source,
                    "apply failed part-way; not rolling back",
                );
                return Err(AddonError::ApplyPartial {
                    applied,
                    total,
                    source,
                });
            }
        }

        phase = phase.next();
        tracing::debug!(addon = addon.name(), %phase, "manifests applied");

        if let Err(err) = addon.callbacks().after_apply(client, &config, prior).await {
            let err = match err {
                reconcile @ AddonError::ReconcileFailure(_) => reconcile,
                other => AddonError::ReconcileFailure(other.to_string()),
            };
            tracing::warn!(addon = addon.name(), %phase, error = %err, "apply failed");
            return Err(err);
        }

        phase = phase.next();
        tracing::info!(addon = addon.name(), %phase, total, "apply complete");
        debug_assert!(phase.is_terminal());

        Ok(ApplyOutcome {
            addon: addon.name().to_string(),
            addon_version: addon.version().to_string(),
            manifests_applied: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cilium::CiliumAddon;
    use crate::kured::KuredAddon;
    use crate::testutil::RecordingClient;
    use skipper_kubernetes::ClusterVersion;

    fn engine() -> AddonEngine {
        AddonEngine::new(Arc::new(VersionCatalog::builtin()))
    }

    fn addon_config(version: ClusterVersion) -> AddonConfiguration {
        AddonConfiguration {
            cluster_version: version,
            control_plane: "https://10.0.0.1:6443".to_string(),
            cluster_name: "test-cluster".to_string(),
        }
    }

    #[test]
    fn phases_advance_one_way_into_done() {
        let mut phase = ApplyPhase::Validating;
        let mut seen = vec![phase];
        while !phase.is_terminal() {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                ApplyPhase::Validating,
                ApplyPhase::Rendering,
                ApplyPhase::Applying,
                ApplyPhase::Reconciling,
                ApplyPhase::Done,
            ],
        );
        assert_eq!(ApplyPhase::Done.next(), ApplyPhase::Done);
        assert_eq!(ApplyPhase::Failed.next(), ApplyPhase::Failed);
    }

    #[tokio::test]
    async fn validation_failure_performs_zero_writes() {
        let client = RecordingClient::default();
        let addon = CiliumAddon::default();
        let ver = ClusterVersion::new(1, 18, 10);

        let result = engine()
            .apply(&client, &addon, addon_config(ver), None)
            .await;

        assert!(matches!(result, Err(AddonError::PreconditionFailed(_))));
        assert_eq!(client.write_count(), 0);
        assert!(client.applied_manifests().is_empty());
    }

    #[tokio::test]
    async fn unsupported_version_fails_in_rendering_with_zero_writes() {
        let client = RecordingClient::default();
        let addon = KuredAddon::default();
        let ver = ClusterVersion::new(9, 9, 9);

        let result = engine()
            .apply(&client, &addon, addon_config(ver), None)
            .await;

        assert!(matches!(result, Err(AddonError::UnsupportedVersion(_))));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn successful_apply_runs_all_phases() {
        let client = RecordingClient::default();
        let addon = CiliumAddon::default();
        let ver = ClusterVersion::new(1, 18, 10);
        let prior = ClusterConfiguration::new(ver);

        let outcome = engine()
            .apply(&client, &addon, addon_config(ver), Some(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.addon, "cilium");
        assert_eq!(outcome.manifests_applied, 4);
        assert_eq!(client.applied_manifests().len(), 4);
        // 4 manifests plus the after_apply configuration record
        assert_eq!(client.write_count(), 5);
    }

    #[tokio::test]
    async fn partial_apply_failure_reports_counts_and_keeps_applied() {
        let client = RecordingClient::default().fail_apply_after(2);
        let addon = CiliumAddon::default();
        let ver = ClusterVersion::new(1, 18, 10);
        let prior = ClusterConfiguration::new(ver);

        let result = engine()
            .apply(&client, &addon, addon_config(ver), Some(&prior))
            .await;

        match result {
            Err(AddonError::ApplyPartial { applied, total, .. }) => {
                assert_eq!(applied, 2);
                assert_eq!(total, 4);
            }
            other => panic!("expected ApplyPartial, got {other:?}"),
        }
        // The two applied manifests stay; nothing is rolled back
        assert_eq!(client.applied_manifests().len(), 2);
    }

    #[tokio::test]
    async fn reconcile_failure_does_not_undo_the_apply() {
        let client = RecordingClient::default().fail_config_patch();
        let addon = CiliumAddon::default();
        let ver = ClusterVersion::new(1, 18, 10);
        let prior = ClusterConfiguration::new(ver);

        let result = engine()
            .apply(&client, &addon, addon_config(ver), Some(&prior))
            .await;

        assert!(matches!(result, Err(AddonError::ReconcileFailure(_))));
        assert_eq!(client.applied_manifests().len(), 4);
    }

    #[tokio::test]
    async fn kured_applies_without_prior_configuration() {
        let client = RecordingClient::default();
        let addon = KuredAddon::default();
        let ver = ClusterVersion::new(1, 17, 13);

        let outcome = engine()
            .apply(&client, &addon, addon_config(ver), None)
            .await
            .unwrap();

        assert_eq!(outcome.addon, "kured");
        assert_eq!(outcome.manifests_applied, 1);
    }
}
