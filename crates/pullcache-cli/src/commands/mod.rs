//! CLI commands and argument parsing.

pub mod blob;
pub mod cache;
pub mod check;
pub mod manifest;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use pullcache_core::{Manifest, MediaType};
use pullcache_proxy::{OriginManifest, ProxyConfig, PullThroughCache};

/// Pullcache - pull-through cache for OCI container registries
#[derive(Parser)]
#[command(name = "pullcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a manifest from an upstream registry
    Manifest(manifest::ManifestArgs),

    /// Stream a blob from an upstream registry
    Blob(blob::BlobArgs),

    /// Fetch an artifact and cache it into the local registry
    Cache(cache::CacheArgs),

    /// List manifest dependencies missing from local storage
    Check(check::CheckArgs),

    /// Print version information
    Version,
}

/// Configuration options shared by every command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "PULLCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Secret the local registry accepts from this service
    #[arg(long, env = "PULLCACHE_SERVICE_SECRET", hide_env_values = true)]
    pub service_secret: Option<String>,
}

impl ConfigArgs {
    /// Loads the configuration file, applying command-line overrides.
    pub fn load(&self) -> Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ProxyConfig::default(),
        };
        if let Some(secret) = &self.service_secret {
            config.service_secret.clone_from(secret);
        }
        debug!(config = ?config, "Loaded configuration");
        Ok(config)
    }

    /// Builds the cache coordinator from the loaded configuration.
    pub fn cache(&self) -> Result<PullThroughCache> {
        let config = self.load()?;
        PullThroughCache::from_config(&config).context("Failed to initialize cache")
    }
}

/// Fetches a manifest, failing unless the origin has it.
pub async fn require_manifest(
    cache: &PullThroughCache,
    repository: &str,
    reference: &str,
    registry_id: i64,
) -> Result<(Manifest, pullcache_core::Descriptor)> {
    match cache
        .fetch_manifest_from_origin(repository, reference, registry_id)
        .await
        .context("Failed to fetch manifest")?
    {
        OriginManifest::Found {
            manifest,
            descriptor,
        } => Ok((manifest, descriptor)),
        OriginManifest::NotFound => {
            anyhow::bail!("Manifest not found: {repository}:{reference}")
        }
        OriginManifest::Unavailable { reason } => {
            anyhow::bail!("Registry {registry_id} is unavailable: {reason}")
        }
    }
}

/// Short label for a manifest media type.
pub fn kind_label(media_type: &MediaType) -> &'static str {
    if media_type.is_manifest_list() {
        "manifest list"
    } else {
        "image manifest"
    }
}
