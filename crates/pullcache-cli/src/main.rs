//! Pullcache CLI - pull-through cache for OCI registries.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pullcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Manifest(args) => commands::manifest::run(&args).await,
        Commands::Blob(args) => commands::blob::run(&args).await,
        Commands::Cache(args) => commands::cache::run(&args).await,
        Commands::Check(args) => commands::check::run(&args).await,
        Commands::Version => {
            println!("pullcache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
