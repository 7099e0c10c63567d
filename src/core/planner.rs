//! Plan generation module.
//!
//! Pure functions from resolved records and source files to a [`Plan`].
//! Nothing here touches the disk; the executor decides what actually happens.

use crate::core::episode;
use crate::generators::filename::{episode_filename, extract_disc_identifier, movie_filename, sidecar_filename};
use crate::generators::folder::{country_folder, movie_folder, season_folder, show_folder};
use crate::generators::nfo::{self, MOVIE_NFO, POSTER_FILE, SEASON_NFO};
use crate::models::group::{SourceFile, SourceGroup};
use crate::models::media::{EpisodeKey, MediaRecord, SeasonRecord};
use crate::models::plan::{FileOperation, Plan};
use crate::utils::fs::{file_name, get_extension};
use crate::Error;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Planner switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Insert a production-country folder above each movie folder.
    pub country_folder: bool,
    /// Emit poster placement operations.
    pub artwork: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            country_folder: false,
            artwork: true,
        }
    }
}

/// Episodes of one show bucketed by key.
#[derive(Debug, Default)]
pub struct EpisodeBuckets {
    pub episodes: BTreeMap<EpisodeKey, SourceFile>,
    /// Files without an `SxxEyy` token.
    pub unkeyed: Vec<SourceFile>,
    /// Files whose key is claimed more than once; none of them is planned.
    pub conflicted: Vec<SourceFile>,
    pub conflicts: Vec<Error>,
}

/// Plan for one show plus the files it leaves behind.
#[derive(Debug, Default)]
pub struct ShowPlan {
    pub plan: Plan,
    /// Source paths (videos and their sidecars) that must be quarantined,
    /// each with the reason.
    pub quarantine: Vec<(PathBuf, String)>,
}

impl ShowPlan {
    /// Whether at least one episode is moved by the plan.
    pub fn has_episodes(&self) -> bool {
        self.plan
            .count(crate::models::plan::OperationKind::MoveRename)
            > 0
    }
}

/// Push a move unless the file is already where it belongs.
fn push_move(plan: &mut Plan, source: &Path, target: PathBuf) {
    if source == target {
        tracing::debug!("Already in place: {:?}", source);
        return;
    }
    plan.push(FileOperation::move_rename(source, target));
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Move a video and its named sidecars into `dir` under `target_name`.
fn push_video(plan: &mut Plan, file: &SourceFile, dir: &Path, target_name: String) {
    let target = dir.join(&target_name);
    let source_stem = file_stem(&file.path);
    let target_stem = file_stem(&target);

    push_move(plan, &file.path, target);
    for sidecar in &file.sidecars {
        let name = sidecar_filename(&file_name(sidecar), &source_stem, &target_stem);
        push_move(plan, sidecar, dir.join(name));
    }
}

/// Plan the reorganization of one movie group.
///
/// Operation order: folders, media moves, carried extras, sidecar, poster.
pub fn plan_movie(
    record: &MediaRecord,
    group: &SourceGroup,
    root: &Path,
    options: PlanOptions,
) -> Plan {
    let folder = movie_folder(record);
    let mut plan = Plan::new(folder.clone());

    let parent = if options.country_folder {
        let country = root.join(country_folder(record.countries.first()));
        plan.push(FileOperation::create_dir(&country));
        country
    } else {
        root.to_path_buf()
    };
    let movie_dir = parent.join(&folder);
    plan.push(FileOperation::create_dir(&movie_dir));

    for file in &group.files {
        let disc = extract_disc_identifier(&file.file_name());
        let ext = get_extension(&file.path).unwrap_or_default();
        let name = movie_filename(record, &file.video, disc.as_deref(), &ext);
        push_video(&mut plan, file, &movie_dir, name);
    }

    // Loose subtitles and subtitle folders only follow a movie that owns its folder
    if group.owns_folder() {
        for extra in &group.extras {
            push_move(&mut plan, extra, movie_dir.join(file_name(extra)));
        }
    }

    plan.push(FileOperation::write_sidecar(
        movie_dir.join(MOVIE_NFO),
        nfo::generate_movie_nfo(record),
    ));
    if options.artwork {
        if let Some(ref poster) = record.poster_ref {
            plan.push(FileOperation::place_artwork(
                movie_dir.join(POSTER_FILE),
                poster.clone(),
            ));
        }
    }

    plan
}

/// Bucket a show's video files by episode key.
///
/// Two files claiming the same key yield a [`Error::DuplicateEpisodeConflict`]
/// and neither file is kept in `episodes`.
pub fn group_episodes(files: &[SourceFile]) -> EpisodeBuckets {
    let mut claims: BTreeMap<EpisodeKey, Vec<&SourceFile>> = BTreeMap::new();
    let mut buckets = EpisodeBuckets::default();

    for file in files {
        match episode::extract(&file.file_name()) {
            Some(key) => claims.entry(key).or_default().push(file),
            None => {
                tracing::warn!("No episode number in {:?}", file.path);
                buckets.unkeyed.push(file.clone());
            }
        }
    }

    for (key, claimants) in claims {
        if claimants.len() == 1 {
            buckets.episodes.insert(key, claimants[0].clone());
            continue;
        }
        let err = Error::DuplicateEpisodeConflict {
            season: key.season,
            episode: key.episode,
            sources: claimants.iter().map(|f| f.path.clone()).collect(),
        };
        tracing::warn!("{}", err);
        buckets.conflicts.push(err);
        buckets
            .conflicted
            .extend(claimants.into_iter().cloned());
    }

    buckets
}

fn quarantine_paths<'a>(
    file: &'a SourceFile,
    reason: &'a str,
) -> impl Iterator<Item = (PathBuf, String)> + 'a {
    std::iter::once(&file.path)
        .chain(&file.sidecars)
        .map(move |p| (p.clone(), reason.to_string()))
}

/// Plan the reorganization of one show.
///
/// Seasons without a record are left out and their files are returned for
/// quarantine, as are unkeyed and conflicting files.
pub fn plan_show(
    record: &MediaRecord,
    seasons: &BTreeMap<u16, SeasonRecord>,
    buckets: &EpisodeBuckets,
    root: &Path,
    options: PlanOptions,
) -> ShowPlan {
    let folder = show_folder(record);
    let show_dir = root.join(&folder);
    let mut result = ShowPlan {
        plan: Plan::new(folder),
        quarantine: Vec::new(),
    };

    for file in &buckets.unkeyed {
        result
            .quarantine
            .extend(quarantine_paths(file, "no episode number in file name"));
    }
    for file in &buckets.conflicted {
        result
            .quarantine
            .extend(quarantine_paths(file, "duplicate episode number"));
    }

    let mut by_season: BTreeMap<u16, Vec<(EpisodeKey, &SourceFile)>> = BTreeMap::new();
    for (key, file) in &buckets.episodes {
        by_season.entry(key.season).or_default().push((*key, file));
    }

    let mut season_plans = Plan::new(result.plan.label.clone());
    for (number, episodes) in by_season {
        let Some(season) = seasons.get(&number) else {
            tracing::warn!("Season {} of '{}' has no catalog record", number, record.original_title);
            let reason = format!("no catalog record for season {}", number);
            for (_, file) in episodes {
                result.quarantine.extend(quarantine_paths(file, &reason));
            }
            continue;
        };

        let season_dir = show_dir.join(season_folder(number, season.air_year));
        season_plans.push(FileOperation::create_dir(&season_dir));

        for (key, file) in episodes {
            let ext = get_extension(&file.path).unwrap_or_default();
            let name = episode_filename(record, key, &file.video, &ext);
            push_video(&mut season_plans, file, &season_dir, name);
        }

        season_plans.push(FileOperation::write_sidecar(
            season_dir.join(SEASON_NFO),
            nfo::generate_season_nfo(record, season),
        ));
        if options.artwork {
            if let Some(poster) = season.poster_ref.as_ref().or(record.poster_ref.as_ref()) {
                season_plans.push(FileOperation::place_artwork(
                    season_dir.join(POSTER_FILE),
                    poster.clone(),
                ));
            }
        }
    }

    if !season_plans.is_empty() {
        result.plan.push(FileOperation::create_dir(&show_dir));
        result.plan.extend(season_plans);
    }
    result
}
