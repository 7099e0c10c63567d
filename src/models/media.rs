//! Media-related data models.

use serde::{Deserialize, Serialize};

/// Declared media kind of a run or a source group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    TvShow,
}

impl MediaKind {
    /// Value of the `type` field the AI backend must echo back.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::TvShow => "tv_show",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::TvShow => write!(f, "tv show"),
        }
    }
}

/// Unresolved title/year guess produced by the name classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseCandidate {
    pub kind: MediaKind,
    /// Localized (usually Chinese) title. May be empty when only one title is known.
    pub localized_title: String,
    /// Original-language title. May be empty when only one title is known.
    pub original_title: String,
    pub year: Option<u16>,
    /// Confidence in [0, 1] as reported by the backend.
    pub confidence: f32,
}

/// Production country of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 code (e.g., "US").
    pub code: String,
    /// Display name (e.g., "United States of America").
    pub name: String,
}

/// Catalog-resolved metadata for one movie or one show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub kind: MediaKind,
    pub localized_title: String,
    pub original_title: String,
    /// Release year (movies) or first air year (shows).
    pub year: u16,
    /// Catalog (TMDB) identifier. Never zero for a resolved record.
    pub external_id: u64,
    pub imdb_id: Option<String>,
    pub overview: String,
    pub poster_ref: Option<String>,
    /// Production countries, most significant first.
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub extras: RecordExtras,
}

/// Descriptive catalog fields that only end up in `movie.nfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordExtras {
    /// Full release date (`YYYY-MM-DD`).
    pub release_date: Option<String>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    /// Catalog user rating (0-10).
    pub rating: Option<f32>,
    pub votes: Option<u32>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub directors: Vec<String>,
    /// Billed cast, lead first.
    pub cast: Vec<CastMember>,
    pub thumb_url: Option<String>,
    pub fanart_url: Option<String>,
}

/// One billed actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub role: Option<String>,
}

/// Catalog detail for one season of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season_number: u16,
    /// Year the season started airing.
    pub air_year: u16,
    pub overview: String,
    pub poster_ref: Option<String>,
}

/// Season/episode numbers extracted from an episode filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: u16,
    pub episode: u16,
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Video technical properties used for the filename suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Resolution (e.g., "2160p", "1080p").
    pub resolution: String,
    /// Video format (e.g., "BluRay", "WEB-DL").
    pub format: String,
    /// Video codec (e.g., "hevc", "h264").
    pub video_codec: String,
    /// Bit depth (e.g., 8, 10).
    pub bit_depth: u8,
    /// Audio codec (e.g., "DTS", "AC3", "AAC").
    pub audio_codec: String,
    /// Audio channels (e.g., "5.1", "7.1").
    pub audio_channels: String,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            resolution: "unknown".to_string(),
            format: "Unknown".to_string(),
            video_codec: "unknown".to_string(),
            bit_depth: 8,
            audio_codec: "unknown".to_string(),
            audio_channels: "unknown".to_string(),
        }
    }
}

impl VideoMetadata {
    /// Technical suffix: `resolution-format-codec-bitdepthbit-audio-channels`.
    pub fn suffix(&self) -> String {
        format!(
            "{}-{}-{}-{}bit-{}-{}",
            self.resolution,
            self.format,
            self.video_codec,
            self.bit_depth,
            self.audio_codec,
            self.audio_channels
        )
    }
}
