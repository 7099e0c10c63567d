//! Organize command implementation.
//!
//! Wires configuration, backends and the pipeline together, runs it over one
//! directory and prints the run summary.

use crate::cli::args::MediaType;
use crate::core::classifier::NameClassifier;
use crate::core::executor::Executor;
use crate::core::pipeline::{Pipeline, RunOptions};
use crate::core::resolver::MetadataResolver;
use crate::models::config::Config;
use crate::models::media::MediaKind;
use crate::models::plan::{OperationKind, OperationStatus};
use crate::models::summary::RunSummary;
use crate::services::ollama::OllamaClient;
use crate::services::tmdb::TmdbClient;
use crate::services::{AiBackend, ArtworkSource, CatalogBackend};
use crate::utils::fs::{ensure_directory, RealFileSystem};
use crate::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Planned operations shown in a dry-run summary.
const DRY_RUN_PREVIEW: usize = 20;

/// Command line overrides for one run.
#[derive(Debug, Clone)]
pub struct OrganizeArgs {
    pub media_type: MediaType,
    pub dry_run: bool,
    pub country_folder: bool,
    pub batch_width: Option<usize>,
    pub min_confidence: Option<f32>,
}

/// Build run options from configuration and command line overrides.
pub fn run_options(config: &Config, args: &OrganizeArgs) -> Result<RunOptions> {
    let kind = MediaKind::from(args.media_type);
    if args.country_folder && kind != MediaKind::Movie {
        tracing::warn!("--country-folder only applies to movies; ignored");
    }

    let min_confidence = args
        .min_confidence
        .unwrap_or(config.processing.min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(crate::Error::Config(format!(
            "min confidence {} outside [0, 1]",
            min_confidence
        )));
    }

    Ok(RunOptions {
        kind,
        dry_run: args.dry_run,
        country_folder: args.country_folder && kind == MediaKind::Movie,
        batch_width: args
            .batch_width
            .unwrap_or(config.processing.batch_width)
            .max(1),
        min_confidence,
        probe_media: config.processing.probe_media,
        download_artwork: config.processing.download_artwork,
        show_progress: true,
    })
}

/// Execute the organize command.
pub async fn organize(
    path: &Path,
    args: OrganizeArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    ensure_directory(path)?;
    let options = run_options(config, &args)?;

    let header = match options.kind {
        MediaKind::Movie => "[MOVIE] Organizing movies...",
        MediaKind::TvShow => "[TV] Organizing TV shows...",
    };
    println!("{}", header.bold().cyan());
    println!("  {} {}", "Path:".bold(), path.display());
    if options.dry_run {
        println!("  {} {}", "Mode:".bold(), "dry run (nothing is changed)".yellow());
    }
    if options.country_folder {
        println!("  {} country folders", "Layout:".bold());
    }
    println!();

    let ai: Arc<dyn AiBackend> = Arc::new(OllamaClient::with_config(config.ollama())?);
    let tmdb = Arc::new(TmdbClient::new(config.tmdb()?)?);
    let catalog: Arc<dyn CatalogBackend> = tmdb.clone();
    let artwork: Arc<dyn ArtworkSource> = tmdb;

    let pipeline = Pipeline::new(
        NameClassifier::new(ai, config.ai_retry()),
        MetadataResolver::new(catalog, config.catalog_retry()),
        Executor::new(Arc::new(RealFileSystem), Some(artwork), options.dry_run),
        options,
    );

    let summary = pipeline.run(path, &cancel).await?;
    print_summary(&summary);

    match summary.save(&config.reports_dir) {
        Ok(file) => println!("\n  {} {}", "Report:".bold(), file.display()),
        Err(e) => tracing::warn!("Could not save run report: {}", e),
    }

    Ok(summary)
}

/// Print the final run summary.
pub fn print_summary(summary: &RunSummary) {
    println!();
    let title = if summary.dry_run {
        "[DRY-RUN] Run Summary"
    } else {
        "Run Summary"
    };
    println!("{}", title.bold().green());
    println!("  Organized:   {}", summary.organized.len().to_string().green());
    println!(
        "  Quarantined: {}",
        summary.quarantined.len().to_string().yellow()
    );
    if summary.was_interrupted() {
        println!(
            "  Interrupted: {}",
            summary.interrupted.len().to_string().red()
        );
    }
    println!("  Unwanted:    {}", summary.unwanted);
    println!(
        "  Operations:  {} applied, {} skipped, {} failed",
        summary.report.applied.to_string().green(),
        summary.report.skipped,
        summary.report.failed.to_string().red()
    );

    if !summary.quarantined.is_empty() {
        println!();
        println!("{}", "Quarantined:".bold().yellow());
        for entry in &summary.quarantined {
            println!("  - {}: {}", entry.name, entry.reason.dimmed());
        }
    }

    if !summary.report.failures.is_empty() {
        println!();
        println!("{}", "Failed operations:".bold().red());
        for failure in &summary.report.failures {
            println!("  - {}: {}", failure.path.display(), failure.reason);
        }
    }

    if !summary.interrupted.is_empty() {
        println!();
        println!("{}", "Left untouched (interrupted):".bold().red());
        for name in &summary.interrupted {
            println!("  - {}", name);
        }
    }

    if summary.dry_run {
        print_preview(summary);
    }
}

fn print_preview(summary: &RunSummary) {
    let planned: Vec<_> = summary
        .plans
        .iter()
        .flat_map(|p| p.entries.iter())
        .filter(|e| e.status == OperationStatus::Applied)
        .collect();
    if planned.is_empty() {
        return;
    }

    println!();
    println!("{}", "Planned operations:".bold());
    for entry in planned.iter().take(DRY_RUN_PREVIEW) {
        let op = &entry.operation;
        match (op.kind, op.source.as_ref()) {
            (OperationKind::MoveRename, Some(source)) => println!(
                "  {} {} -> {}",
                "MOVE".cyan(),
                source.display(),
                op.target.display()
            ),
            (OperationKind::CreateDir, _) => {
                println!("  {} {}", "MKDIR".cyan(), op.target.display())
            }
            (OperationKind::WriteSidecar, _) => {
                println!("  {} {}", "NFO".cyan(), op.target.display())
            }
            (OperationKind::PlaceArtwork, _) => {
                println!("  {} {}", "POSTER".cyan(), op.target.display())
            }
            (OperationKind::MoveRename, None) => {}
        }
    }
    if planned.len() > DRY_RUN_PREVIEW {
        println!("  ... and {} more", planned.len() - DRY_RUN_PREVIEW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(media_type: MediaType) -> OrganizeArgs {
        OrganizeArgs {
            media_type,
            dry_run: false,
            country_folder: true,
            batch_width: None,
            min_confidence: None,
        }
    }

    #[test]
    fn test_run_options_from_config() {
        let config = Config::default();
        let options = run_options(&config, &args(MediaType::Movie)).unwrap();
        assert_eq!(options.kind, MediaKind::Movie);
        assert!(options.country_folder);
        assert_eq!(options.batch_width, config.processing.batch_width);
    }

    #[test]
    fn test_country_folder_ignored_for_tv() {
        let options = run_options(&Config::default(), &args(MediaType::Tv)).unwrap();
        assert!(!options.country_folder);
    }

    #[test]
    fn test_invalid_min_confidence() {
        let mut a = args(MediaType::Movie);
        a.min_confidence = Some(1.5);
        assert!(run_options(&Config::default(), &a).is_err());
    }
}
