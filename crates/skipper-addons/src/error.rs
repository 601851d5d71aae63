//! Error types for the addon engine

use skipper_kubernetes::{CatalogError, ClientError, ConfigError};
use thiserror::Error;

/// Failures an apply attempt can surface
///
/// Everything is propagated to the caller; the engine never retries or
/// rolls back on its own.
#[derive(Debug, Error)]
pub enum AddonError {
    /// Cluster version is not in the version catalog
    #[error(transparent)]
    UnsupportedVersion(#[from] CatalogError),

    /// A `before_apply` precondition was not met; nothing was written
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Manifest rendering failed
    #[error("failed to render manifests: {0}")]
    Render(String),

    /// Some manifests were applied before one failed; no rollback is
    /// attempted, re-applying the addon is the recovery path
    #[error("applied {applied} of {total} manifests before failure: {source}")]
    ApplyPartial {
        applied: usize,
        total: usize,
        #[source]
        source: ClientError,
    },

    /// `after_apply` failed; the applied manifests are left in place
    #[error("post-apply reconciliation failed: {0}")]
    ReconcileFailure(String),

    /// Reading or writing the stored cluster configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cluster read failed outside the apply step
    #[error(transparent)]
    Client(#[from] ClientError),

    /// No addon registered under the requested name
    #[error("unknown addon: {0}")]
    UnknownAddon(String),
}
