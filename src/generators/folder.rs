//! Folder name generator.

use crate::models::media::{Country, MediaRecord};
use crate::utils::chinese;
use regex::Regex;
use std::sync::OnceLock;

/// Country folder used when the catalog lists no production country.
pub const UNKNOWN_COUNTRY_FOLDER: &str = "Unknown_Unknown";

/// Sanitize a string for use in filenames.
pub fn sanitize_filename(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Title part of a folder name: `original-localized`, or a single title when
/// the two are equivalent or one is blank.
pub fn title_part(original: &str, localized: &str) -> String {
    let original = sanitize_filename(original);
    let localized = sanitize_filename(localized);

    if localized.is_empty() || chinese::titles_equivalent(&original, &localized) {
        original
    } else if original.is_empty() {
        localized
    } else {
        format!("{}-{}", original, localized)
    }
}

/// Generate movie folder name.
///
/// Format: `${originalTitle}-${localizedTitle}-${year}-${imdb}-${tmdb}`; the
/// IMDb id is omitted when unknown.
pub fn movie_folder(record: &MediaRecord) -> String {
    let mut parts = vec![
        title_part(&record.original_title, &record.localized_title),
        record.year.to_string(),
    ];
    if let Some(ref imdb) = record.imdb_id {
        parts.push(imdb.clone());
    }
    parts.push(record.external_id.to_string());
    parts.join("-")
}

/// Generate TV show folder name.
///
/// Format: `${showOriginalTitle}-${showTitle}-${imdb}-${tmdb}`
pub fn show_folder(record: &MediaRecord) -> String {
    let mut parts = vec![title_part(&record.original_title, &record.localized_title)];
    if let Some(ref imdb) = record.imdb_id {
        parts.push(imdb.clone());
    }
    parts.push(record.external_id.to_string());
    parts.join("-")
}

/// Generate season folder name.
///
/// Format: `S${seasonNr2}-${seasonAirYear}`
pub fn season_folder(season_number: u16, air_year: u16) -> String {
    format!("S{:02}-{}", season_number, air_year)
}

/// Generate country folder name from the first production country.
///
/// Format: `${ISO}_${Display_Name}` (e.g., `US_United_States_of_America`).
pub fn country_folder(country: Option<&Country>) -> String {
    match country {
        Some(c) if !c.code.trim().is_empty() => {
            let name = if c.name.trim().is_empty() {
                c.code.trim().to_string()
            } else {
                c.name.trim().replace(' ', "_").replace('&', "and")
            };
            sanitize_filename(&format!("{}_{}", c.code.trim(), name))
        }
        _ => UNKNOWN_COUNTRY_FOLDER.to_string(),
    }
}

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Movie: titles-year(-imdb)-tmdb
            r"^.+-(?:18|19|20)\d{2}(?:-tt\d{7,8})?-\d+$",
            // Show: titles-imdb-tmdb
            r"^.+-tt\d{7,8}-\d+$",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Whether a folder name looks like organizer output.
///
/// Show folders without an IMDb id (`Title-12345`) cannot be told apart from
/// arbitrary names by pattern alone; the scanner and the cleanup sweep also
/// check for organizer output inside the folder.
pub fn looks_organized(name: &str) -> bool {
    patterns().iter().any(|re| re.is_match(name))
}

/// Whether a folder name is a season folder (`S01-2011`).
pub fn is_season_folder(name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^S\d{2}-\d{4}$").ok())
        .as_ref()
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

/// Whether a folder name is a country folder (`US_United_States`).
pub fn is_country_folder(name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    name == UNKNOWN_COUNTRY_FOLDER
        || RE
            .get_or_init(|| Regex::new(r"^[A-Z]{2,3}_[A-Za-z_]+$").ok())
            .as_ref()
            .map(|re| re.is_match(name))
            .unwrap_or(false)
}
