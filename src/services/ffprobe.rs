//! Technical property probing.
//!
//! Properties come from two places: pattern tables applied to the file name
//! (always available) and `ffprobe` JSON output (when installed). Probe values
//! win; name values fill the gaps.

use crate::models::media::VideoMetadata;
use crate::Result;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

/// FFprobe output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

/// FFprobe stream information.
#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bits_per_raw_sample: Option<String>,
    pix_fmt: Option<String>,
    channels: Option<u32>,
}

/// FFprobe format information.
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
}

/// Check if ffprobe is installed.
pub fn is_installed() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Get ffprobe version.
pub fn get_version() -> Result<String> {
    let output = Command::new("ffprobe").arg("-version").output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or(UNKNOWN).to_string())
}

/// Run ffprobe on a file.
pub fn extract_metadata(path: &Path) -> Result<VideoMetadata> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(crate::Error::other(format!(
            "ffprobe failed for: {}",
            path.display()
        )));
    }

    metadata_from_probe_json(&output.stdout, path)
}

/// Technical properties for a file: name patterns refined by ffprobe when enabled.
///
/// Never fails; an unreadable file keeps the name-derived values.
pub async fn probe(path: &Path, use_ffprobe: bool) -> VideoMetadata {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let from_name = parse_metadata_from_filename(&filename);
    if !use_ffprobe {
        return from_name;
    }

    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || extract_metadata(&owned)).await {
        Ok(Ok(probed)) => merge_metadata(probed, from_name),
        Ok(Err(e)) => {
            tracing::debug!("ffprobe unavailable for {}: {}", path.display(), e);
            from_name
        }
        Err(e) => {
            tracing::warn!("ffprobe task failed for {}: {}", path.display(), e);
            from_name
        }
    }
}

/// Decode ffprobe JSON output.
fn metadata_from_probe_json(bytes: &[u8], path: &Path) -> Result<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(bytes)?;

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    let resolution = video
        .and_then(|s| match (s.width, s.height) {
            (Some(w), Some(h)) => Some(resolution_to_string(w, h)),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let bit_depth = video
        .and_then(|s| {
            s.bits_per_raw_sample
                .as_deref()
                .and_then(|b| b.parse().ok())
                .or_else(|| {
                    s.pix_fmt.as_deref().map(|p| {
                        if p.contains("10") {
                            10
                        } else if p.contains("12") {
                            12
                        } else {
                            8
                        }
                    })
                })
        })
        .unwrap_or(8);

    let format_name = probe
        .format
        .map(|f| f.format_name)
        .unwrap_or_default();

    Ok(VideoMetadata {
        resolution,
        format: detect_format(&format_name, path),
        video_codec: video
            .and_then(|s| s.codec_name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        bit_depth,
        audio_codec: audio
            .and_then(|s| s.codec_name.as_deref())
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        audio_channels: audio
            .and_then(|s| s.channels)
            .map(channels_to_string)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    })
}

/// Convert resolution to standard string (e.g., "2160p", "1080p").
fn resolution_to_string(width: u32, height: u32) -> String {
    if height >= 2160 || width >= 3840 {
        "2160p".to_string()
    } else if height >= 1080 || width >= 1920 {
        "1080p".to_string()
    } else if height >= 720 || width >= 1280 {
        "720p".to_string()
    } else if height >= 480 || width >= 720 {
        "480p".to_string()
    } else {
        format!("{}p", height)
    }
}

/// Convert channel count to layout (e.g., "5.1", "7.1").
fn channels_to_string(channels: u32) -> String {
    match channels {
        6 => "5.1".to_string(),
        8 => "7.1".to_string(),
        n => format!("{}.0", n),
    }
}

/// Container only says so much about the source; `Unknown` lets the name decide.
fn detect_format(format_name: &str, path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext == "m2ts" || (format_name.contains("mpegts") && ext == "ts") {
        "BluRay".to_string()
    } else if format_name.contains("avi") {
        "DVDRip".to_string()
    } else {
        "Unknown".to_string()
    }
}

const RESOLUTIONS: &[(&str, &str)] = &[
    ("2160p", "2160p"),
    ("4k", "2160p"),
    ("uhd", "2160p"),
    ("1080p", "1080p"),
    ("1080i", "1080p"),
    ("fhd", "1080p"),
    ("720p", "720p"),
    ("576p", "576p"),
    ("480p", "480p"),
];

const FORMATS: &[(&str, &str)] = &[
    ("remux", "Remux"),
    ("bluray", "BluRay"),
    ("blu-ray", "BluRay"),
    ("bdrip", "BluRay"),
    ("brrip", "BluRay"),
    ("web-dl", "WEB-DL"),
    ("webdl", "WEB-DL"),
    ("webrip", "WEBRip"),
    ("hdtv", "HDTV"),
    ("dvdrip", "DVDRip"),
    ("hdrip", "HDRip"),
    ("web", "WEB"),
    ("dvd", "DVD"),
];

const VIDEO_CODECS: &[(&str, &str)] = &[
    ("hevc", "hevc"),
    ("h.265", "hevc"),
    ("h265", "hevc"),
    ("x265", "hevc"),
    ("h.264", "h264"),
    ("h264", "h264"),
    ("x264", "h264"),
    ("avc", "h264"),
    ("av1", "av1"),
    ("vp9", "vp9"),
    ("xvid", "xvid"),
    ("divx", "divx"),
];

const AUDIO_CODECS: &[(&str, &str)] = &[
    ("truehd", "TrueHD"),
    ("dts-hd.ma", "DTS-HD.MA"),
    ("dts-hd", "DTS-HD"),
    ("dts-x", "DTS-X"),
    ("dts", "DTS"),
    ("ddp", "EAC3"),
    ("eac3", "EAC3"),
    ("dd5.1", "AC3"),
    ("ac3", "AC3"),
    ("aac", "AAC"),
    ("flac", "FLAC"),
    ("opus", "Opus"),
    ("mp3", "MP3"),
];

const CHANNELS: &[(&str, &str)] = &[
    ("7.1", "7.1"),
    ("5.1", "5.1"),
    ("2.0", "2.0"),
    ("stereo", "2.0"),
    ("mono", "1.0"),
];

/// Tokens of a lowercase file name, split on separators. Dotted groups such as
/// `dts-hd.ma` or `5.1` are matched against the whole name instead.
fn tokens(name: &str) -> Vec<&str> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// First table entry found in the name. Entries with punctuation match as
/// substrings, plain entries must match a whole token.
fn first_match(name: &str, table: &[(&str, &str)]) -> Option<String> {
    let toks = tokens(name);
    table
        .iter()
        .find(|(pattern, _)| {
            if pattern.chars().all(|c| c.is_alphanumeric()) {
                toks.iter().any(|t| t == pattern)
            } else {
                name.contains(pattern)
            }
        })
        .map(|(_, value)| value.to_string())
}

/// Parse video metadata from a file name.
pub fn parse_metadata_from_filename(filename: &str) -> VideoMetadata {
    let name = filename.to_lowercase();
    let toks = tokens(&name);

    let bit_depth = if toks.iter().any(|t| *t == "10bit" || *t == "hi10p") || name.contains("10-bit")
    {
        10
    } else if toks.iter().any(|t| *t == "12bit") || name.contains("12-bit") {
        12
    } else if toks.iter().any(|t| *t == "hdr" || *t == "hdr10") {
        10
    } else {
        8
    };

    VideoMetadata {
        resolution: first_match(&name, RESOLUTIONS).unwrap_or_else(|| UNKNOWN.to_string()),
        format: first_match(&name, FORMATS).unwrap_or_else(|| "Unknown".to_string()),
        video_codec: first_match(&name, VIDEO_CODECS).unwrap_or_else(|| UNKNOWN.to_string()),
        bit_depth,
        audio_codec: first_match(&name, AUDIO_CODECS).unwrap_or_else(|| UNKNOWN.to_string()),
        audio_channels: first_match(&name, CHANNELS).unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// Merge two VideoMetadata, preferring values from primary, falling back to secondary.
pub fn merge_metadata(primary: VideoMetadata, secondary: VideoMetadata) -> VideoMetadata {
    fn pick(a: String, b: String) -> String {
        if a.eq_ignore_ascii_case(UNKNOWN) {
            b
        } else {
            a
        }
    }

    VideoMetadata {
        resolution: pick(primary.resolution, secondary.resolution),
        format: pick(primary.format, secondary.format),
        video_codec: pick(primary.video_codec, secondary.video_codec),
        bit_depth: primary.bit_depth.max(secondary.bit_depth),
        audio_codec: pick(primary.audio_codec, secondary.audio_codec),
        audio_channels: pick(primary.audio_channels, secondary.audio_channels),
    }
}
