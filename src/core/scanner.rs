//! Directory scanner module.
//!
//! Walks the root recursively and turns video files into [`SourceGroup`]s:
//! one group per movie file, or one group per top-level show folder.

use crate::core::quarantine::{holds_output, is_holding_area};
use crate::generators::folder::{is_country_folder, looks_organized};
use crate::models::group::{SourceFile, SourceGroup};
use crate::models::media::MediaKind;
use crate::services::ffprobe;
use crate::utils::fs::{ensure_directory, file_name, get_extension, RealFileSystem};
use crate::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    // Common formats
    "mkv", "mp4", "avi", "mov", "wmv", // Additional formats
    "m4v", "ts", "m2ts", "flv", "webm", // Less common but supported
    "mpg", "mpeg", "vob", "ogv", "ogm", "divx", "xvid", "3gp", "3g2", "mts", "rm", "rmvb", "asf",
    "f4v",
];

/// Subtitle file extensions.
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt", "sup", "smi"];

/// Folder names holding subtitles.
const SUBTITLE_FOLDERS: &[&str] = &["sub", "subs", "subtitle", "subtitles", "字幕"];

/// Scanner switches.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub kind: MediaKind,
    /// Leave country folders (`US_United_States`) alone.
    pub country_mode: bool,
}

/// Check if a file extension is a video format.
fn is_video_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
}

fn is_subtitle(path: &Path) -> bool {
    get_extension(path)
        .map(|e| SUBTITLE_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

fn is_subtitle_folder(name: &str) -> bool {
    SUBTITLE_FOLDERS.contains(&name.to_lowercase().as_str())
}

/// Check if a path is inside an "Extras" directory.
///
/// Extras directories contain behind-the-scenes content, deleted scenes, etc.
/// These are never classified as main content.
///
/// Patterns matched (case-insensitive):
/// - "Extras", "Featurettes", "Behind the Scenes", "Deleted Scenes"
/// - "Making of", "Bonus", "Special Features", "Sample"
/// - Names containing ".extras", "-extras", "_extras" (e.g., "The.Bourne.Identity.Extras-Grym")
fn is_in_extras_directory(path: &Path) -> bool {
    const EXTRAS_NAMES: &[&str] = &[
        "extras",
        "extra",
        "featurettes",
        "featurette",
        "behind the scenes",
        "behindthescenes",
        "deleted scenes",
        "deletedscenes",
        "making of",
        "makingof",
        "bonus",
        "bonuses",
        "special features",
        "specialfeatures",
        "sample",
        "samples",
    ];

    path.components().any(|component| {
        let Component::Normal(name) = component else {
            return false;
        };
        let name_str = name.to_string_lossy().to_lowercase();
        EXTRAS_NAMES.contains(&name_str.as_str())
            || ["extras", "featurette", "sample"].iter().any(|tag| {
                name_str.contains(&format!(".{}", tag))
                    || name_str.contains(&format!("-{}", tag))
                    || name_str.contains(&format!("_{}", tag))
            })
    })
}

/// Check if a filename indicates a sample file.
/// Matches filenames containing "sample" (case-insensitive).
fn is_sample_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.contains("sample") && !lower.contains("sampler")
}

/// Whether a top-level entry is left alone by the scan.
fn is_excluded_top_level(entry: &DirEntry, options: &ScanOptions) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || is_holding_area(&name) {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    looks_organized(&name)
        || holds_output(&RealFileSystem, entry.path())
        || (options.country_mode && is_country_folder(&name))
}

/// Video files under `root`, sorted, skipping excluded folders, extras and samples.
fn collect_videos(root: &Path, options: &ScanOptions) -> Vec<PathBuf> {
    let mut videos = Vec::new();
    let mut total_files = 0usize;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && is_excluded_top_level(e, options)));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        total_files += 1;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        if is_in_extras_directory(relative) {
            tracing::debug!("Extras file skipped: {}", path.display());
            continue;
        }
        let is_video = path
            .extension()
            .map(|ext| is_video_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if !is_video {
            continue;
        }
        if is_sample_filename(&file_name(path)) {
            tracing::debug!("Sample file skipped: {}", path.display());
            continue;
        }
        videos.push(path.to_path_buf());
    }

    tracing::info!("Scanned {} files: {} videos", total_files, videos.len());
    videos
}

/// Subtitle files next to `video` whose name starts with its stem.
fn find_sidecars(video: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(stem)) = (video.parent(), video.file_stem()) else {
        return Vec::new();
    };
    let prefix = format!("{}.", stem.to_string_lossy());

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut sidecars: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_subtitle(p) && file_name(p).starts_with(&prefix))
        .collect();
    sidecars.sort();
    sidecars
}

/// Loose subtitles and subtitle folders in `dir` not already claimed.
fn find_extras(dir: &Path, claimed: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut extras: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| !claimed.contains(p))
        .filter(|p| {
            (p.is_file() && is_subtitle(p)) || (p.is_dir() && is_subtitle_folder(&file_name(p)))
        })
        .collect();
    extras.sort();
    extras
}

fn source_file(path: PathBuf) -> SourceFile {
    let mut file = SourceFile::new(path);
    file.sidecars = find_sidecars(&file.path);
    file.video = ffprobe::parse_metadata_from_filename(&file.file_name());
    file
}

/// First path component of `path` below `root`, when `path` is nested.
fn top_level(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    components.next()?;
    Some(root.join(first))
}

/// Scan `root` into source groups of the declared kind.
pub fn scan_groups(root: &Path, options: ScanOptions) -> Result<Vec<SourceGroup>> {
    ensure_directory(root)?;
    let videos = collect_videos(root, &options);

    let groups = match options.kind {
        MediaKind::Movie => movie_groups(root, videos),
        MediaKind::TvShow => show_groups(root, videos),
    };
    tracing::info!("Found {} {} groups", groups.len(), options.kind);
    Ok(groups)
}

fn movie_groups(root: &Path, videos: Vec<PathBuf>) -> Vec<SourceGroup> {
    let mut per_folder: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for video in &videos {
        if let Some(top) = top_level(root, video) {
            *per_folder.entry(top).or_default() += 1;
        }
    }

    videos
        .into_iter()
        .map(|path| {
            let file = source_file(path);
            let context = file
                .path
                .parent()
                .filter(|p| *p != root)
                .map(file_name);

            // A folder holding just this movie travels with it
            let anchor = match top_level(root, &file.path) {
                Some(top) if per_folder.get(&top) == Some(&1) => top,
                _ => file.path.clone(),
            };

            let extras = if anchor != file.path {
                let claimed: HashSet<PathBuf> = file.sidecars.iter().cloned().collect();
                file.path
                    .parent()
                    .map(|dir| find_extras(dir, &claimed))
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            SourceGroup {
                kind: MediaKind::Movie,
                name: file.file_name(),
                context,
                anchor,
                files: vec![file],
                extras,
            }
        })
        .collect()
}

fn show_groups(root: &Path, videos: Vec<PathBuf>) -> Vec<SourceGroup> {
    let mut by_folder: BTreeMap<PathBuf, Vec<SourceFile>> = BTreeMap::new();
    let mut loose = Vec::new();

    for path in videos {
        match top_level(root, &path) {
            Some(top) => by_folder.entry(top).or_default().push(source_file(path)),
            None => loose.push(source_file(path)),
        }
    }

    let mut groups: Vec<SourceGroup> = by_folder
        .into_iter()
        .map(|(folder, files)| SourceGroup {
            kind: MediaKind::TvShow,
            name: file_name(&folder),
            context: None,
            anchor: folder,
            files,
            extras: Vec::new(),
        })
        .collect();

    // An episode file directly under the root is a show of its own
    groups.extend(loose.into_iter().map(|file| SourceGroup {
        kind: MediaKind::TvShow,
        name: file.file_name(),
        context: None,
        anchor: file.path.clone(),
        files: vec![file],
        extras: Vec::new(),
    }));
    groups
}
