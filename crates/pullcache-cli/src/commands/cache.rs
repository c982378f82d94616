//! Cache command implementation.
//!
//! Fetches an artifact from the upstream registry and runs the cache writer
//! in the foreground, waiting for it to finish.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use pullcache_core::{ArtifactInfo, ContentDigest, Project};
use pullcache_proxy::{CacheOutcome, CacheRequest};

use super::{kind_label, require_manifest, ConfigArgs};

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Upstream registry id
    #[arg(short = 'r', long, env = "PULLCACHE_REGISTRY_ID")]
    pub registry_id: i64,

    /// Proxy project to cache into
    #[arg(short, long)]
    pub project: String,

    /// Id of the proxy project
    #[arg(long, default_value = "1")]
    pub project_id: i64,

    /// Repository at the upstream registry
    pub repository: String,

    /// Tag or digest
    #[arg(long, default_value = "latest")]
    pub reference: String,
}

/// Runs the cache command.
pub async fn run(args: &CacheArgs) -> Result<()> {
    let cache = args.config.cache()?;
    let project = Project::new(args.project_id, &args.project).with_registry(args.registry_id);

    let (manifest, descriptor) =
        require_manifest(&cache, &args.repository, &args.reference, args.registry_id).await?;

    let mut artifact = ArtifactInfo::new(&project.name, project.repository_name(&args.repository))
        .with_digest(descriptor.digest.clone());
    if ContentDigest::parse(&args.reference).is_err() {
        artifact = artifact.with_tag(&args.reference);
    }

    info!(
        key = %artifact.key(),
        digest = %descriptor.digest,
        kind = kind_label(manifest.media_type()),
        "Caching artifact"
    );
    eprintln!(
        "Caching {} into project '{}'; this waits for dependencies and can take minutes",
        artifact.key(),
        project.name
    );

    let request = CacheRequest::new(manifest, artifact, project, &args.repository);
    let Some(task) = cache.cache_artifact(request) else {
        println!("Artifact is already being cached");
        return Ok(());
    };
    let outcome = task.await.context("Cache task panicked")?;

    match outcome {
        CacheOutcome::Pushed {
            digest,
            attempts,
            converged,
        } => {
            println!("Pushed manifest {digest}");
            println!("  Attempts with missing blobs: {attempts}");
            println!("  All blobs present: {}", if converged { "yes" } else { "no" });
        }
        CacheOutcome::ListPushed { digest, entries } => {
            println!("Pushed manifest list {digest} with {entries} entries");
        }
        CacheOutcome::Skipped => println!("Artifact is already being cached"),
        CacheOutcome::Failed { reason } => anyhow::bail!("Caching failed: {reason}"),
    }

    Ok(())
}
