//! Quarantine and cleanup.
//!
//! Unresolved source items move to `<root>/Unmatched`, keeping their path
//! relative to the root. After a run, leftover top-level items move to
//! `<root>/Unwanted`. Nothing is ever deleted.

use crate::generators::folder::{is_country_folder, is_season_folder, looks_organized};
use crate::generators::nfo::MOVIE_NFO;
use crate::models::plan::{FileOperation, Plan};
use crate::utils::fs::{file_name, FileSystem};
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Holding area for unresolved input.
pub const UNMATCHED_DIR: &str = "Unmatched";
/// Holding area for leftover residue.
pub const UNWANTED_DIR: &str = "Unwanted";

/// Whether a top-level name is one of the holding areas.
pub fn is_holding_area(name: &str) -> bool {
    name == UNMATCHED_DIR || name == UNWANTED_DIR
}

/// First free path for `preferred`, appending ` (1)`, ` (2)`, ... before the
/// extension when taken or already claimed by this plan.
fn free_target(fs: &dyn FileSystem, preferred: PathBuf, claimed: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| fs.exists(p) || claimed.contains(p);
    if !taken(&preferred) {
        return preferred;
    }

    let parent = preferred.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = preferred
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = preferred
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| parent.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !taken(p))
        .unwrap_or(preferred)
}

/// Plan moving `paths` into the holding area `area` under `root`.
fn holding_plan(
    fs: &dyn FileSystem,
    root: &Path,
    area: &str,
    paths: &[PathBuf],
) -> Plan {
    let area_dir = root.join(area);
    let mut plan = Plan::new(area);
    if paths.is_empty() {
        return plan;
    }
    plan.push(FileOperation::create_dir(&area_dir));

    let mut claimed = HashSet::new();
    for path in paths {
        let relative = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file_name(path)));
        let target = free_target(fs, area_dir.join(relative), &claimed);
        claimed.insert(target.clone());
        plan.push(FileOperation::move_rename(path, target));
    }
    plan
}

/// Plan moving unresolved items into `<root>/Unmatched`.
///
/// Nested paths keep their structure, so the files of a partially organized
/// show land under `Unmatched/<show folder>/...`.
pub fn quarantine_plan(fs: &dyn FileSystem, root: &Path, paths: &[PathBuf]) -> Plan {
    holding_plan(fs, root, UNMATCHED_DIR, paths)
}

/// Whether a directory holds organizer output: a `movie.nfo` or a season
/// folder. Catches show folders whose name alone does not look organized.
pub fn holds_output(fs: &dyn FileSystem, dir: &Path) -> bool {
    if fs.exists(&dir.join(MOVIE_NFO)) {
        return true;
    }
    fs.read_dir(dir)
        .map(|children| {
            children
                .iter()
                .any(|c| fs.is_dir(c) && is_season_folder(&file_name(c)))
        })
        .unwrap_or(false)
}

/// Plan the final sweep of `root` into `<root>/Unwanted`.
///
/// Kept in place: the holding areas, organized folders, and country folders
/// when country mode is on.
pub fn cleanup_plan(fs: &dyn FileSystem, root: &Path, country_mode: bool) -> Result<Plan> {
    let mut leftovers = Vec::new();

    for entry in fs.read_dir(root)? {
        let name = file_name(&entry);
        if is_holding_area(&name) {
            continue;
        }
        if fs.is_dir(&entry) {
            if looks_organized(&name) || holds_output(fs, &entry) {
                continue;
            }
            if country_mode && is_country_folder(&name) {
                continue;
            }
        }
        tracing::debug!("Leftover: {:?}", entry);
        leftovers.push(entry);
    }

    Ok(holding_plan(fs, root, UNWANTED_DIR, &leftovers))
}
