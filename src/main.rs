//! skipper: addon lifecycle engine for Kubernetes clusters

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use skipper_addons::{AddonConfiguration, AddonEngine, AddonRegistry};
use skipper_kubernetes::{ClusterConfiguration, ClusterVersion, KubeClusterClient, VersionCatalog};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, prelude::*};

/// skipper: resolve, render and apply versioned cluster addons
#[derive(Parser, Debug)]
#[command(name = "skipper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a version catalog YAML file (default: built-in catalog)
    #[arg(long)]
    catalog: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply an addon to the target cluster
    Apply {
        /// Addon to apply (e.g. cilium, kured)
        #[arg(short, long)]
        addon: String,

        /// Name of the target cluster
        #[arg(long)]
        cluster_name: String,

        /// Control-plane endpoint, e.g. https://10.0.0.1:6443
        #[arg(long)]
        control_plane: String,

        /// Target cluster version (default: version recorded in the
        /// cluster, or the newest supported one)
        #[arg(long)]
        kubernetes_version: Option<String>,
    },

    /// List supported cluster versions and their image repositories
    Versions,

    /// List addons this build of skipper can apply
    Addons,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    color_eyre::install()?;

    // Quiet down the HTTP stack unless explicitly asked for
    let filter = if cli.debug {
        EnvFilter::from_default_env()
            .add_directive(Level::DEBUG.into())
            .add_directive("hyper=info".parse().unwrap())
            .add_directive("tower=info".parse().unwrap())
            .add_directive("rustls=info".parse().unwrap())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    let catalog = Arc::new(load_catalog(cli.catalog.as_deref())?);

    match cli.command {
        Command::Versions => {
            for version in catalog.available_versions() {
                // repository_base cannot fail for a catalog-listed version
                let base = catalog
                    .repository_base(&version)
                    .map_err(|e| eyre!("catalog inconsistency: {e}"))?;
                println!("{version}\t{base}");
            }
        }
        Command::Addons => {
            let registry = AddonRegistry::with_defaults();
            for name in registry.names() {
                let addon = registry.get(name).map_err(|e| eyre!(e))?;
                println!("{name}\t{}", addon.version());
            }
        }
        Command::Apply {
            addon,
            cluster_name,
            control_plane,
            kubernetes_version,
        } => {
            let registry = AddonRegistry::with_defaults();
            let addon = registry.get(&addon).map_err(|e| eyre!(e))?;

            let kube_client = kube::Client::try_default().await?;
            let client = KubeClusterClient::new(kube_client);

            let prior = ClusterConfiguration::load(&client).await?;
            let cluster_version =
                resolve_target_version(kubernetes_version.as_deref(), prior.as_ref(), &catalog)?;

            let config = AddonConfiguration {
                cluster_version,
                control_plane,
                cluster_name,
            };

            tracing::info!(
                addon = addon.name(),
                version = addon.version(),
                cluster = %config.cluster_name,
                kubernetes = %config.cluster_version,
                "applying addon",
            );

            let engine = AddonEngine::new(catalog);
            let outcome = engine.apply(&client, addon, config, prior.as_ref()).await?;
            println!(
                "applied {} {} ({} manifests)",
                outcome.addon, outcome.addon_version, outcome.manifests_applied,
            );
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&str>) -> Result<VersionCatalog> {
    match path {
        Some(path) => Ok(VersionCatalog::from_path(path)?),
        None => Ok(VersionCatalog::builtin()),
    }
}

/// Pick the cluster version an apply should target: an explicit flag wins,
/// then the version recorded in the cluster, then the newest supported one
fn resolve_target_version(
    explicit: Option<&str>,
    prior: Option<&ClusterConfiguration>,
    catalog: &VersionCatalog,
) -> Result<ClusterVersion> {
    if let Some(raw) = explicit {
        return Ok(raw.parse()?);
    }
    if let Some(prior) = prior {
        return Ok(prior.kubernetes_version);
    }
    Ok(catalog.latest_version())
}
