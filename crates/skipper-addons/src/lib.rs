//! Addon lifecycle engine for skipper
//!
//! Resolves versioned addon image references against the cluster version
//! catalog, renders them into manifest sets, and drives the ordered apply
//! lifecycle (validate, render, apply, reconcile) against a live cluster.

pub mod addon;
pub mod cilium;
pub mod engine;
pub mod error;
pub mod images;
pub mod kured;
pub mod render;

#[cfg(test)]
pub(crate) mod testutil;

pub use addon::{Addon, AddonCallbacks, AddonConfiguration, AddonRegistry};
pub use engine::{AddonEngine, ApplyOutcome, ApplyPhase};
pub use error::AddonError;
pub use images::ImageResolver;
pub use render::RenderContext;
