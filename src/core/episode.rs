//! Episode pattern extraction.
//!
//! Season/episode numbers come from the `SxxEyy` token of the file name, never
//! from the AI backend.

use crate::models::media::EpisodeKey;
use regex::Regex;
use std::sync::OnceLock;

fn episode_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})e(\d{1,2})(?:[^0-9]|$)").ok())
        .as_ref()
}

/// Extract the episode key from a file name.
///
/// Matches `S<1-2 digits>E<1-2 digits>` case-insensitively, delimited so that
/// words like `Lost.S01E01` match but `ABCS01E01` or `S01E0123` do not.
/// Returns `None` when the name carries no such token.
pub fn extract(filename: &str) -> Option<EpisodeKey> {
    let caps = episode_regex()?.captures(filename)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let episode = caps.get(2)?.as_str().parse().ok()?;
    Some(EpisodeKey { season, episode })
}
