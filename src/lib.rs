//! Media Reorg Library
//!
//! Classifies movie and TV files with an AI backend, resolves them against
//! TMDB and reorganizes them into a media-center library tree.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod preflight;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
