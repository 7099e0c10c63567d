//! Filename generator.

use super::folder::{movie_folder, sanitize_filename};
use crate::models::media::{EpisodeKey, MediaRecord, VideoMetadata};
use regex::Regex;
use std::sync::OnceLock;

fn disc_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Separated: "Movie.cd1.mkv", "Movie - Part 2.mkv"
            r"[_\s\-\.](cd|disc|disk|part|dvd)[\s\.]?(\d{1,2})(?:[^0-9]|$)",
            // Glued to the title right before the extension: "Moviecd2.avi"
            r"(cd|disc|disk|part|dvd)(\d{1,2})\.[a-z0-9]+$",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Extract disc/part identifier from filename.
///
/// Detects patterns like: cd1, disc2, part1, dvd1.
/// Returns the identifier in lowercase format (e.g., "cd1", "part2").
pub fn extract_disc_identifier(filename: &str) -> Option<String> {
    let lower = filename.to_lowercase();
    disc_patterns().iter().find_map(|re| {
        let caps = re.captures(&lower)?;
        let prefix = caps.get(1)?.as_str();
        let num: u32 = caps.get(2)?.as_str().parse().ok()?;
        Some(format!("{}{}", prefix, num))
    })
}

/// Lowercase extension including the dot, or empty.
fn dotted_extension(extension: &str) -> String {
    let ext = extension.trim_start_matches('.');
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext.to_lowercase())
    }
}

/// Generate movie filename.
///
/// Format: `${movieFolder}-${resolution}-${format}-${codec}-${bitDepth}bit-${audioCodec}-${audioChannels}(-${discId})`
pub fn movie_filename(
    record: &MediaRecord,
    video: &VideoMetadata,
    disc_id: Option<&str>,
    extension: &str,
) -> String {
    let mut name = format!("{}-{}", movie_folder(record), video.suffix());
    if let Some(disc) = disc_id {
        name.push('-');
        name.push_str(disc);
    }
    format!("{}{}", name, dotted_extension(extension))
}

/// Generate TV episode filename.
///
/// Format: `${showOriginalTitle}-S${season2}E${episode2}-${technicalSuffix}`
pub fn episode_filename(
    show: &MediaRecord,
    key: EpisodeKey,
    video: &VideoMetadata,
    extension: &str,
) -> String {
    let title = if show.original_title.trim().is_empty() {
        &show.localized_title
    } else {
        &show.original_title
    };
    format!(
        "{}-{}-{}{}",
        sanitize_filename(title),
        key,
        video.suffix(),
        dotted_extension(extension)
    )
}

/// Target name for a sidecar that follows a renamed video.
///
/// `Avatar.2009.zh.srt` next to `Avatar.2009.mkv` becomes `<target_stem>.zh.srt`.
/// A sidecar that does not start with the video stem keeps its name.
pub fn sidecar_filename(sidecar_name: &str, source_stem: &str, target_stem: &str) -> String {
    match sidecar_name.strip_prefix(source_stem) {
        Some(rest) if rest.starts_with('.') => format!("{}{}", target_stem, rest),
        _ => sidecar_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::MediaKind;

    fn record(kind: MediaKind) -> MediaRecord {
        MediaRecord {
            kind,
            localized_title: "阿凡达".to_string(),
            original_title: "Avatar".to_string(),
            year: 2009,
            external_id: 19995,
            imdb_id: Some("tt0499549".to_string()),
            overview: String::new(),
            poster_ref: None,
            countries: Vec::new(),
            extras: Default::default(),
        }
    }

    fn video() -> VideoMetadata {
        VideoMetadata {
            resolution: "1080p".to_string(),
            format: "BluRay".to_string(),
            video_codec: "h264".to_string(),
            bit_depth: 8,
            audio_codec: "DTS".to_string(),
            audio_channels: "5.1".to_string(),
        }
    }

    #[test]
    fn test_extract_disc_identifier() {
        assert_eq!(extract_disc_identifier("Movie.CD1.avi"), Some("cd1".to_string()));
        assert_eq!(extract_disc_identifier("Movie - Part 2.mkv"), Some("part2".to_string()));
        assert_eq!(extract_disc_identifier("Movie_disc02.mkv"), Some("disc2".to_string()));
        assert_eq!(extract_disc_identifier("Moviecd2.avi"), Some("cd2".to_string()));
        assert_eq!(extract_disc_identifier("Movie.2009.1080p.mkv"), None);
        assert_eq!(extract_disc_identifier("Particle.Fever.mkv"), None);
    }

    #[test]
    fn test_movie_filename() {
        let name = movie_filename(&record(MediaKind::Movie), &video(), None, "MKV");
        assert_eq!(
            name,
            "Avatar-阿凡达-2009-tt0499549-19995-1080p-BluRay-h264-8bit-DTS-5.1.mkv"
        );
    }

    #[test]
    fn test_movie_filename_with_disc() {
        let name = movie_filename(&record(MediaKind::Movie), &video(), Some("cd2"), "avi");
        assert!(name.ends_with("-5.1-cd2.avi"));
    }

    #[test]
    fn test_episode_filename() {
        let mut show = record(MediaKind::TvShow);
        show.original_title = "Game of Thrones".to_string();
        let key = EpisodeKey { season: 1, episode: 1 };
        assert_eq!(
            episode_filename(&show, key, &video(), "mkv"),
            "Game of Thrones-S01E01-1080p-BluRay-h264-8bit-DTS-5.1.mkv"
        );
    }

    #[test]
    fn test_sidecar_filename() {
        assert_eq!(
            sidecar_filename("Avatar.2009.zh.srt", "Avatar.2009", "Avatar-2009-19995"),
            "Avatar-2009-19995.zh.srt"
        );
        assert_eq!(
            sidecar_filename("Avatar.2009.srt", "Avatar.2009", "Avatar-2009-19995"),
            "Avatar-2009-19995.srt"
        );
        assert_eq!(
            sidecar_filename("chs.srt", "Avatar.2009", "Avatar-2009-19995"),
            "chs.srt"
        );
    }
}
