//! Integration tests for the scanner module.
//!
//! Tests cover:
//! - Movie grouping (own folder vs loose files vs shared folders)
//! - Show grouping by top-level folder
//! - Sidecar and extras detection
//! - Sample/extras exclusion
//! - Skipping organized output and holding areas
//! - Error handling for non-existent paths

use media_reorg::core::scanner::{scan_groups, ScanOptions};
use media_reorg::models::media::MediaKind;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn movies() -> ScanOptions {
    ScanOptions {
        kind: MediaKind::Movie,
        country_mode: false,
    }
}

fn shows() -> ScanOptions {
    ScanOptions {
        kind: MediaKind::TvShow,
        country_mode: false,
    }
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "fake content").unwrap();
}

// ========== MOVIE TESTS ==========

#[test]
fn test_scan_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let groups = scan_groups(temp_dir.path(), movies()).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_movie_in_own_folder() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let folder = root.join("Avatar.2009");
    touch(&folder.join("阿凡达.Avatar.2009.1080p.BluRay.x264.mkv"));
    touch(&folder.join("阿凡达.Avatar.2009.1080p.BluRay.x264.zh.srt"));
    touch(&folder.join("other.srt"));
    touch(&folder.join("Subs").join("eng.srt"));

    let groups = scan_groups(root, movies()).unwrap();
    assert_eq!(groups.len(), 1);

    let group = &groups[0];
    assert_eq!(group.anchor, folder);
    assert_eq!(group.name, "阿凡达.Avatar.2009.1080p.BluRay.x264.mkv");
    assert_eq!(group.context.as_deref(), Some("Avatar.2009"));
    assert!(group.owns_folder());
    assert_eq!(
        group.files[0].sidecars,
        vec![folder.join("阿凡达.Avatar.2009.1080p.BluRay.x264.zh.srt")]
    );
    assert_eq!(group.files[0].video.resolution, "1080p");
    assert_eq!(group.extras, vec![folder.join("Subs"), folder.join("other.srt")]);
}

#[test]
fn test_loose_movie_files_are_separate_groups() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(&root.join("Inception.2010.mkv"));
    touch(&root.join("Heat.1995.mp4"));

    let groups = scan_groups(root, movies()).unwrap();
    assert_eq!(groups.len(), 2);
    for group in &groups {
        assert_eq!(group.anchor, group.files[0].path);
        assert!(group.context.is_none());
        assert!(!group.owns_folder());
        assert!(group.extras.is_empty());
    }
}

#[test]
fn test_shared_folder_is_not_an_anchor() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let folder = root.join("Collection");
    touch(&folder.join("Heat.1995.mkv"));
    touch(&folder.join("Ronin.1998.mkv"));

    let groups = scan_groups(root, movies()).unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.anchor != folder));
    assert!(groups.iter().all(|g| g.context.as_deref() == Some("Collection")));
}

#[test]
fn test_samples_and_extras_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let folder = root.join("Heat.1995");
    touch(&folder.join("Heat.1995.mkv"));
    touch(&folder.join("Sample").join("sample.mkv"));
    touch(&folder.join("Extras").join("interview.mkv"));
    touch(&folder.join("heat-sample.mkv"));

    let groups = scan_groups(root, movies()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].anchor, folder);
}

#[test]
fn test_organized_output_and_holding_areas_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(
        &root
            .join("Avatar-阿凡达-2009-tt0499549-19995")
            .join("Avatar-阿凡达-2009-tt0499549-19995-1080p.mkv"),
    );
    touch(&root.join("Unmatched").join("Mystery.mkv"));
    touch(&root.join("Unwanted").join("junk.mkv"));
    touch(&root.join(".hidden").join("x.mkv"));
    touch(&root.join("Heat.1995.mkv"));

    let groups = scan_groups(root, movies()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Heat.1995.mkv");
}

#[test]
fn test_folder_with_movie_nfo_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(&root.join("Hand Named").join("movie.mkv"));
    touch(&root.join("Hand Named").join("movie.nfo"));

    assert!(scan_groups(root, movies()).unwrap().is_empty());
}

#[test]
fn test_country_folders_skipped_in_country_mode() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(&root.join("US_United_States_of_America").join("Heat.1995.mkv"));

    let country = ScanOptions {
        kind: MediaKind::Movie,
        country_mode: true,
    };
    assert!(scan_groups(root, country).unwrap().is_empty());
    assert_eq!(scan_groups(root, movies()).unwrap().len(), 1);
}

// ========== SHOW TESTS ==========

#[test]
fn test_show_folder_is_one_group() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let show = root.join("权力的游戏");
    touch(&show.join("Season 1").join("GoT.S01E01.mkv"));
    touch(&show.join("Season 1").join("GoT.S01E02.mkv"));
    touch(&show.join("Season 2").join("GoT.S02E01.mkv"));
    touch(&root.join("Loose.Show.S01E01.mkv"));

    let groups = scan_groups(root, shows()).unwrap();
    assert_eq!(groups.len(), 2);

    let folder = groups.iter().find(|g| g.anchor == show).unwrap();
    assert_eq!(folder.name, "权力的游戏");
    assert_eq!(folder.files.len(), 3);
    assert!(folder.extras.is_empty());

    let loose = groups.iter().find(|g| g.anchor != show).unwrap();
    assert_eq!(loose.name, "Loose.Show.S01E01.mkv");
}

#[test]
fn test_organized_show_without_imdb_id_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let organized = root.join("Show A-剧A-555");
    touch(&organized.join("S01-2015").join("Show A-S01E01.mkv"));
    touch(&organized.join("S01-2015").join("season.nfo"));
    touch(&root.join("Show B").join("Show.B.S01E01.mkv"));

    let groups = scan_groups(root, shows()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Show B");
}

// ========== ERROR TESTS ==========

#[test]
fn test_scan_nonexistent_directory() {
    let result = scan_groups(Path::new("/nonexistent/path/that/does/not/exist"), movies());
    assert!(result.is_err());
}

#[test]
fn test_scan_file_instead_of_directory() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("file.txt");
    fs::write(&file_path, "content").unwrap();

    assert!(scan_groups(&file_path, movies()).is_err());
}
