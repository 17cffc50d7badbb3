///
/// This module implements the CLI interface for subsync: command parsing,
/// argument validation and the async entrypoint.
///
/// All pipeline logic (fetching, normalising, merging, rendering) lives in
/// the [`subsync-core`] crate. This module is glue: it loads configuration,
/// builds the HTTP fetcher and the Gist publisher, and reports outcomes.
///
/// ## How To Use
/// - For command-line users: use the installed `subsync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`subsync-core`]: ../../subsync-core/
use crate::load_config::load_or_default;
use crate::publish::GistClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use subsync_core::config::SyncConfig;
use subsync_core::contract::Artifact;
use subsync_core::fetch::HttpFetcher;
use subsync_core::synchronise::{aggregate, publish, AggregateReport};

/// CLI for subsync: merge public proxy subscriptions and publish them.
#[derive(Parser)]
#[clap(
    name = "subsync",
    version,
    about = "Aggregate public proxy subscriptions into Clash/V2Ray artifacts and publish them to a Gist"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all sources, merge them and publish the artifacts to the Gist
    Sync {
        /// Path to the YAML config file (built-in sources when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Fetch all sources, merge them and write the artifacts to a directory
    Render {
        /// Path to the YAML config file (built-in sources when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Directory the artifacts are written to
        #[clap(long)]
        out_dir: PathBuf,
    },
}

async fn build_artifacts(config: Option<PathBuf>) -> Result<(SyncConfig, AggregateReport)> {
    let config = load_or_default(config)?;
    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to build HTTP client")?;
    let report = aggregate(&config, &fetcher).await?;
    tracing::info!(
        fetched = report.sources_fetched,
        total = report.sources_total,
        clash_nodes = report.structured_nodes,
        v2ray_nodes = report.uri_nodes,
        files = report.artifacts.len(),
        "Aggregation complete"
    );
    Ok((config, report))
}

fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    for artifact in artifacts {
        let path = out_dir.join(&artifact.filename);
        fs::write(&path, &artifact.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = artifact.content.len(), "Wrote artifact");
    }
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            tracing::info!(command = "sync", "Starting synchronisation");
            let (config, report) = build_artifacts(config).await?;
            // Secrets are only needed from here on; fetch and merge have already run.
            let publisher = GistClient::new_from_env(&config.publish)
                .context("Cannot publish without Gist credentials")?;
            let receipt = publish(&publisher, &report.artifacts).await?;
            tracing::info!(
                command = "sync",
                files = receipt.files,
                location = %receipt.location,
                "Synchronisation complete"
            );
            Ok(())
        }
        Commands::Render { config, out_dir } => {
            tracing::info!(command = "render", out_dir = %out_dir.display(), "Rendering artifacts");
            let (_, report) = build_artifacts(config).await?;
            write_artifacts(&out_dir, &report.artifacts)?;
            tracing::info!(command = "render", files = report.artifacts.len(), "Render complete");
            Ok(())
        }
    }
}
