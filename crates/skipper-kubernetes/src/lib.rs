//! Cluster-facing primitives for skipper
//!
//! This crate owns everything that touches or describes a Kubernetes
//! cluster directly: the version identifier and catalog, the narrow client
//! abstraction the addon engine consumes, and the stored configuration
//! snapshot skipper keeps inside the cluster.

pub mod catalog;
pub mod client;
pub mod config;
pub mod version;

pub use catalog::{CatalogError, VersionCatalog};
pub use client::{ClientError, ClusterClient, FIELD_MANAGER, KubeClusterClient};
pub use config::{ClusterConfiguration, ConfigError, CONFIG_NAME, CONFIG_NAMESPACE};
pub use version::{ClusterVersion, VersionParseError};
