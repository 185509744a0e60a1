use anyhow::{Context, Result};
use blogsync_core::contract::LocalFile;
use blogsync_core::publish::{publish, PublishOutcome, PublishReport};
use blogsync_core::state::{PublishObserver, RunState};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::ftp::FtpConnector;
use crate::load_config::{load_config, SiteConfig};
use crate::prompt::TerminalPrompt;
use crate::render::SiteRenderer;

/// CLI for blogsync: build a markdown blog and publish it over FTP.
#[derive(Parser)]
#[clap(
    name = "blogsync",
    version,
    about = "Render a markdown blog and upload new or changed files to an FTP host"
)]
pub struct Cli {
    /// Site root containing content/, templates/ and output/
    #[clap(long, default_value = ".")]
    pub root: PathBuf,

    /// Path to the site index (defaults to <root>/content/index.yml)
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Render entries and the front page into output/
    Build,
    /// Upload new or changed files from output/ to the FTP host
    Publish,
    /// Build, then publish
    Sync,
}

/// Prints run progress to stdout.
pub struct ConsoleObserver;

impl PublishObserver for ConsoleObserver {
    fn on_state_changed(&self, prev: &RunState, next: &RunState) {
        debug!(?prev, ?next, "[CLI] run state changed");
    }

    fn on_upload(&self, file: &LocalFile, _remote_path: &str) {
        println!("Uploading {}", file.path.display());
    }

    fn on_skipped(&self) {
        println!("Skipped publishing.");
    }
}

/// Async CLI entrypoint shared by main() and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(&cli.root, cli.config.as_deref())?;

    match cli.command {
        Commands::Build => build(&config),
        Commands::Publish => publish_site(&config).await,
        Commands::Sync => {
            build(&config)?;
            publish_site(&config).await
        }
    }
}

fn build(config: &SiteConfig) -> Result<()> {
    let report = SiteRenderer::new(config)
        .build()
        .context("Build failed")?;
    println!(
        "Built {} file(s), skipped {} up-to-date entr{}.",
        report.rendered.len(),
        report.skipped.len(),
        if report.skipped.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}

async fn publish_site(config: &SiteConfig) -> Result<()> {
    let publish_config = config.publish_config()?;
    let connector = FtpConnector::new(publish_config.target.clone());
    let mut prompt = TerminalPrompt::new();

    let outcome = publish(&publish_config, &mut prompt, &connector, &ConsoleObserver)
        .await
        .with_context(|| format!("Publishing to {} failed", publish_config.target.addr()))?;

    if let PublishOutcome::Published(report) = outcome {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PublishReport) {
    println!(
        "Published {} file(s) across {} director{}; {} unchanged, {} remote-only.",
        report.uploads.len(),
        report.directories_synced,
        if report.directories_synced == 1 { "y" } else { "ies" },
        report.unchanged,
        report.remote_only
    );
}
