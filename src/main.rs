//! Media Reorg CLI
//!
//! A command-line tool that classifies movie and TV files with AI and
//! reorganizes them into a media-center library using TMDB metadata.

use clap::Parser;
use media_reorg::cli::{
    args::{Cli, Commands},
    commands::{check, organize},
};
use media_reorg::models::config::{load_config, Config};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = load_config()?;

    match cli.command {
        Commands::Check => {
            if !check::check(&config).await {
                anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
            }
        }

        Commands::Organize {
            path,
            media_type,
            dry_run,
            country_folder,
            batch_width,
            min_confidence,
        } => {
            // Run preflight checks unless skipped
            if !cli.skip_preflight {
                run_preflight_checks(&config).await?;
            }

            let cancel = CancellationToken::new();
            tokio::spawn(interrupt_signal(cancel.clone()));

            let args = organize::OrganizeArgs {
                media_type,
                dry_run,
                country_folder,
                batch_width,
                min_confidence,
            };
            let summary = organize::organize(&path, args, &config, cancel.clone()).await?;
            cancel.cancel();

            if summary.was_interrupted() {
                anyhow::bail!("Run interrupted; re-run to process the remaining items.");
            }
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("media_reorg=debug")
    } else {
        EnvFilter::new("media_reorg=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
async fn run_preflight_checks(config: &Config) -> anyhow::Result<()> {
    if !check::check(config).await {
        anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
    }
    Ok(())
}

/// Cancel the run on Ctrl-C. Returns early when the run finishes first.
async fn interrupt_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                tracing::warn!("Interrupt received: finishing in-flight operations, no new lookups");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to install Ctrl-C handler: {}", e),
        },
        _ = cancel.cancelled() => {}
    }
}
