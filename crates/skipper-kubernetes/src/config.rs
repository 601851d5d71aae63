//! Stored cluster configuration snapshot
//!
//! When skipper bootstraps a cluster it records what it did in a ConfigMap
//! in `kube-system`. Later apply operations read that snapshot back to
//! decide whether the cluster is in a state they can safely act on. A
//! missing snapshot means the cluster was never bootstrapped by skipper
//! (or the record was lost) and is treated by dependent addons as a
//! validation failure, never silently ignored.

use crate::client::{ClientError, ClusterClient};
use crate::version::ClusterVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace holding skipper's state ConfigMap
pub const CONFIG_NAMESPACE: &str = "kube-system";
/// Name of the state ConfigMap
pub const CONFIG_NAME: &str = "skipper-config";
/// Key inside the ConfigMap data holding the YAML snapshot
const CONFIG_KEY: &str = "SkipperConfiguration";

/// Errors reading or writing the stored configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("malformed stored configuration: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

/// Snapshot of what skipper last did to a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfiguration {
    /// Control-plane version the cluster was bootstrapped or last upgraded to
    pub kubernetes_version: ClusterVersion,

    /// Addon name to the addon release version last applied
    #[serde(default)]
    pub addon_versions: BTreeMap<String, String>,
}

impl ClusterConfiguration {
    pub fn new(kubernetes_version: ClusterVersion) -> Self {
        ClusterConfiguration {
            kubernetes_version,
            addon_versions: BTreeMap::new(),
        }
    }

    /// Record that an addon release was applied
    pub fn set_addon_version(&mut self, addon: &str, version: &str) {
        self.addon_versions
            .insert(addon.to_string(), version.to_string());
    }

    /// Load the snapshot from the cluster, `None` if it was never written
    pub async fn load(
        client: &dyn ClusterClient,
    ) -> Result<Option<ClusterConfiguration>, ConfigError> {
        let data = client.get_config_map(CONFIG_NAMESPACE, CONFIG_NAME).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let Some(raw) = data.get(CONFIG_KEY) else {
            // ConfigMap exists but the key is gone: treat as absent rather
            // than guessing at cluster state
            tracing::warn!("{CONFIG_NAME} exists but has no {CONFIG_KEY} key");
            return Ok(None);
        };
        let config = serde_yaml::from_str(raw)?;
        Ok(Some(config))
    }

    /// Persist the snapshot back to the cluster
    pub async fn store(&self, client: &dyn ClusterClient) -> Result<(), ConfigError> {
        let raw = serde_yaml::to_string(self)?;
        let mut data = BTreeMap::new();
        data.insert(CONFIG_KEY.to_string(), raw);
        client
            .patch_config_map(CONFIG_NAMESPACE, CONFIG_NAME, data)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_yaml() {
        let mut config = ClusterConfiguration::new(ClusterVersion::new(1, 18, 10));
        config.set_addon_version("cilium", "1.7.5-rev2");

        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: ClusterConfiguration = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.addon_versions["cilium"], "1.7.5-rev2");
    }

    #[test]
    fn missing_addon_versions_defaults_to_empty() {
        let yaml = "kubernetes_version: 1.18.10\n";
        let config: ClusterConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert!(config.addon_versions.is_empty());
    }
}
