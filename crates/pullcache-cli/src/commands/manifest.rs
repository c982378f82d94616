//! Manifest command implementation.
//!
//! Fetches a manifest straight from the upstream registry, optionally
//! narrowing a manifest list down to one platform.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use pullcache_core::Platform;
use pullcache_proxy::select_platform;

use super::{kind_label, require_manifest, ConfigArgs};

/// Arguments for the manifest command.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Upstream registry id
    #[arg(short = 'r', long, env = "PULLCACHE_REGISTRY_ID")]
    pub registry_id: i64,

    /// Repository at the upstream registry (e.g., `library/alpine`)
    pub repository: String,

    /// Tag or digest
    #[arg(long, default_value = "latest")]
    pub reference: String,

    /// Keep only list entries for this platform (`os/arch[/variant]`)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Print the raw manifest payload instead of a summary
    #[arg(long)]
    pub raw: bool,
}

/// Runs the manifest command.
pub async fn run(args: &ManifestArgs) -> Result<()> {
    info!(
        repository = %args.repository,
        reference = %args.reference,
        registry_id = args.registry_id,
        "Fetching manifest"
    );

    let cache = args.config.cache()?;
    let (mut manifest, descriptor) =
        require_manifest(&cache, &args.repository, &args.reference, args.registry_id).await?;

    if let Some(platform) = &args.platform {
        manifest = select_platform(
            &manifest,
            &platform.os,
            &platform.architecture,
            platform.variant_str(),
        )
        .context("Failed to filter manifest list")?;
    }

    if args.raw {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(manifest.payload())?;
        stdout.flush()?;
        return Ok(());
    }

    println!("Manifest: {}:{}", args.repository, args.reference);
    println!("  Digest:     {}", descriptor.digest);
    println!("  Media type: {} ({})", manifest.media_type(), kind_label(manifest.media_type()));
    println!("  Size:       {}", descriptor.size);
    if args.platform.is_some() {
        println!("  Filtered digest: {}", manifest.digest());
    }
    println!();
    println!("References:");
    for reference in manifest.references() {
        match &reference.platform {
            Some(platform) => println!("  {} {:>10}  {platform}", reference.digest, reference.size),
            None => println!("  {} {:>10}", reference.digest, reference.size),
        }
    }

    Ok(())
}
