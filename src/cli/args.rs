//! Command line argument definitions.

use crate::models::media::MediaKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Media Reorg - Classify and reorganize your video files with AI
#[derive(Parser, Debug)]
#[command(name = "media-reorg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify and reorganize a directory in place
    Organize {
        /// Directory to organize
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Kind of media in the directory
        #[arg(short = 't', long = "type", value_enum)]
        media_type: MediaType,

        /// Dry run - show what would be done
        #[arg(long)]
        dry_run: bool,

        /// Group movies under production-country folders
        #[arg(long)]
        country_folder: bool,

        /// Groups classified/resolved concurrently (default: from config)
        #[arg(long, value_name = "N")]
        batch_width: Option<usize>,

        /// Minimum AI confidence, 0.0 to 1.0 (default: from config)
        #[arg(long, value_name = "F")]
        min_confidence: Option<f32>,
    },

    /// Run preflight checks only
    Check,
}

/// Media type accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Tv,
}

impl From<MediaType> for MediaKind {
    fn from(t: MediaType) -> Self {
        match t {
            MediaType::Movie => MediaKind::Movie,
            MediaType::Tv => MediaKind::TvShow,
        }
    }
}
