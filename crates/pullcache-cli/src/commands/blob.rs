//! Blob command implementation.
//!
//! Streams a blob from the upstream registry to a file or stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use pullcache_core::ContentDigest;

use super::ConfigArgs;

/// Arguments for the blob command.
#[derive(Args, Debug)]
pub struct BlobArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Upstream registry id
    #[arg(short = 'r', long, env = "PULLCACHE_REGISTRY_ID")]
    pub registry_id: i64,

    /// Repository at the upstream registry
    pub repository: String,

    /// Blob digest (e.g., `sha256:...`)
    pub digest: ContentDigest,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Runs the blob command.
pub async fn run(args: &BlobArgs) -> Result<()> {
    info!(
        repository = %args.repository,
        digest = %args.digest,
        registry_id = args.registry_id,
        "Fetching blob"
    );

    let cache = args.config.cache()?;

    let descriptor = match &args.output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let descriptor = cache
                .fetch_blob_from_origin(&mut file, &args.repository, &args.digest, args.registry_id)
                .await
                .context("Failed to fetch blob")?;
            file.sync_all().await?;
            eprintln!("Wrote {} bytes to {}", descriptor.size, path.display());
            descriptor
        }
        None => {
            let mut stdout = tokio::io::stdout();
            cache
                .fetch_blob_from_origin(&mut stdout, &args.repository, &args.digest, args.registry_id)
                .await
                .context("Failed to fetch blob")?
        }
    };

    info!(size = descriptor.size, media_type = %descriptor.media_type, "Blob fetched");
    Ok(())
}
