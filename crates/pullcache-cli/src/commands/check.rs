//! Check command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pullcache_core::Descriptor;

use super::{require_manifest, ConfigArgs};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Upstream registry id
    #[arg(short = 'r', long, env = "PULLCACHE_REGISTRY_ID")]
    pub registry_id: i64,

    /// Repository at the upstream registry
    pub repository: String,

    /// Tag or digest
    #[arg(long, default_value = "latest")]
    pub reference: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    repository: &'a str,
    reference: &'a str,
    references: usize,
    missing: &'a [Descriptor],
}

/// Runs the check command.
pub async fn run(args: &CheckArgs) -> Result<()> {
    let cache = args.config.cache()?;
    let (manifest, _) =
        require_manifest(&cache, &args.repository, &args.reference, args.registry_id).await?;
    let missing = cache.check_dependencies(&manifest).await;

    let report = CheckReport {
        repository: &args.repository,
        reference: &args.reference,
        references: manifest.references().len(),
        missing: &missing,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if missing.is_empty() {
        println!("✓ All {} references are cached locally", report.references);
    } else {
        println!(
            "✗ {} of {} references missing locally:",
            missing.len(),
            report.references
        );
        for descriptor in &missing {
            println!("  {} ({} bytes)", descriptor.digest, descriptor.size);
        }
    }
    Ok(())
}
