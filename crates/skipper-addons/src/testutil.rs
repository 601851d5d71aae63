//! Test doubles shared by the addon test modules

use async_trait::async_trait;
use skipper_kubernetes::{ClientError, ClusterClient};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingState {
    reads: usize,
    writes: usize,
    applied: Vec<serde_json::Value>,
    config_maps: BTreeMap<(String, String), BTreeMap<String, String>>,
    pods: BTreeMap<String, Vec<String>>,
}

/// In-memory [`ClusterClient`] that records every call and can be told to
/// fail at a chosen point
#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<RecordingState>,
    fail_apply_after: Option<usize>,
    fail_config_patch: bool,
}

impl RecordingClient {
    /// Pods returned for an exact label selector
    pub fn with_pods(self, selector: &str, names: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .pods
            .insert(selector.to_string(), names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make `apply_manifest` fail once `n` manifests have been applied
    pub fn fail_apply_after(mut self, n: usize) -> Self {
        self.fail_apply_after = Some(n);
        self
    }

    /// Make every `patch_config_map` call fail
    pub fn fail_config_patch(mut self) -> Self {
        self.fail_config_patch = true;
        self
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn applied_manifests(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().applied.clone()
    }
}

#[async_trait]
impl ClusterClient for RecordingClient {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        Ok(state
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_pod_names(
        &self,
        _namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        Ok(state.pods.get(label_selector).cloned().unwrap_or_default())
    }

    async fn apply_manifest(&self, manifest: &serde_json::Value) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = self.fail_apply_after {
            if state.applied.len() >= limit {
                return Err(ClientError::Unavailable("injected apply failure".into()));
            }
        }
        state.writes += 1;
        state.applied.push(manifest.clone());
        Ok(())
    }

    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        if self.fail_config_patch {
            return Err(ClientError::Unavailable("injected patch failure".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state
            .config_maps
            .insert((namespace.to_string(), name.to_string()), data);
        Ok(())
    }
}
