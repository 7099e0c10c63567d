//! Reorganization pipeline.
//!
//! Drives every source group through classify → resolve → plan → execute,
//! quarantining groups that fail at any stage. Classification and resolution
//! run concurrently up to the batch width; plans are executed one at a time
//! so no two plans race on a target path.

use crate::core::classifier::NameClassifier;
use crate::core::executor::Executor;
use crate::core::planner::{self, PlanOptions};
use crate::core::quarantine::{cleanup_plan, quarantine_plan};
use crate::core::resolver::MetadataResolver;
use crate::core::scanner::{scan_groups, ScanOptions};
use crate::models::group::{GroupState, SourceGroup};
use crate::models::media::{MediaKind, MediaRecord, SeasonRecord};
use crate::models::plan::Plan;
use crate::models::summary::RunSummary;
use crate::services::ffprobe;
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Per-run switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub kind: MediaKind,
    pub dry_run: bool,
    pub country_folder: bool,
    /// Groups classified/resolved concurrently.
    pub batch_width: usize,
    /// Candidates below this confidence are quarantined.
    pub min_confidence: f32,
    /// Refine technical properties with ffprobe.
    pub probe_media: bool,
    pub download_artwork: bool,
    pub show_progress: bool,
}

impl RunOptions {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            dry_run: false,
            country_folder: false,
            batch_width: 4,
            min_confidence: 0.5,
            probe_media: false,
            download_artwork: true,
            show_progress: false,
        }
    }

    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            country_folder: self.country_folder && self.kind == MediaKind::Movie,
            artwork: self.download_artwork,
        }
    }
}

/// What the concurrent stage decided for one group.
enum Outcome {
    Planned {
        group: SourceGroup,
        state: GroupState,
        plan: Plan,
        quarantine: Vec<(PathBuf, String)>,
    },
    Quarantine {
        group: SourceGroup,
        state: GroupState,
        reason: String,
    },
    Interrupted {
        group: SourceGroup,
    },
}

/// The classification and reorganization engine.
pub struct Pipeline {
    classifier: NameClassifier,
    resolver: MetadataResolver,
    executor: Executor,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(
        classifier: NameClassifier,
        resolver: MetadataResolver,
        executor: Executor,
        options: RunOptions,
    ) -> Self {
        Self {
            classifier,
            resolver,
            executor,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Scan `root` and reorganize everything found.
    pub async fn run(&self, root: &Path, cancel: &CancellationToken) -> Result<RunSummary> {
        let groups = scan_groups(
            root,
            ScanOptions {
                kind: self.options.kind,
                country_mode: self.options.country_folder,
            },
        )?;
        self.run_groups(root, groups, cancel).await
    }

    /// Reorganize already scanned groups.
    pub async fn run_groups(
        &self,
        root: &Path,
        groups: Vec<SourceGroup>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new(root, self.options.kind, self.options.dry_run);
        let progress = self.progress_bar(groups.len() as u64);

        let mut outcomes = stream::iter(groups)
            .map(|group| self.prepare(group, root, cancel))
            .buffer_unordered(self.options.batch_width.max(1));

        while let Some(outcome) = outcomes.next().await {
            self.finish(outcome, root, &mut summary).await;
            progress.inc(1);
        }
        progress.finish_and_clear();

        if cancel.is_cancelled() {
            tracing::warn!(
                "Interrupted: {} groups left untouched, cleanup skipped",
                summary.interrupted.len()
            );
        } else {
            let mut plan = cleanup_plan(self.executor.fs().as_ref(), root, self.options.country_folder)?;
            let report = self.executor.execute(&mut plan).await;
            summary.unwanted = report.applied;
            if report.applied > 0 {
                tracing::info!("Moved {} leftover items to Unwanted", report.applied);
            }
            summary.report.merge(report);
            if !plan.is_empty() {
                summary.plans.push(plan);
            }
        }

        summary.finished_at = Some(chrono::Utc::now());
        Ok(summary)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    /// Classify, resolve and plan one group. Issues no calls once cancelled.
    async fn prepare(
        &self,
        group: SourceGroup,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Outcome {
        let state = GroupState::Discovered;
        if cancel.is_cancelled() {
            return Outcome::Interrupted { group };
        }

        macro_rules! step {
            ($state:expr, $next:expr) => {
                match $state.advance($next) {
                    Ok(s) => s,
                    Err(e) => {
                        return Outcome::Quarantine {
                            group,
                            state: $state,
                            reason: e.to_string(),
                        }
                    }
                }
            };
        }

        // Classifying
        let state = step!(state, GroupState::Classifying);
        let candidate = match self
            .classifier
            .classify_with_context(&group.name, group.kind, group.context.as_deref(), cancel)
            .await
        {
            Ok(c) => c,
            Err(Error::Cancelled) => return Outcome::Interrupted { group },
            Err(e) => {
                tracing::warn!("{}", e);
                return Outcome::Quarantine {
                    group,
                    state,
                    reason: e.to_string(),
                };
            }
        };
        if candidate.confidence < self.options.min_confidence {
            tracing::warn!(
                "Low confidence {:.2} for '{}' ({} / {})",
                candidate.confidence,
                group.name,
                candidate.original_title,
                candidate.localized_title
            );
            return Outcome::Quarantine {
                reason: format!("low confidence {:.2}", candidate.confidence),
                group,
                state,
            };
        }

        // Resolving
        if cancel.is_cancelled() {
            return Outcome::Interrupted { group };
        }
        let state = step!(state, GroupState::Resolving);
        let resolved = match group.kind {
            MediaKind::Movie => self.resolver.resolve_movie(&candidate, cancel).await,
            MediaKind::TvShow => self.resolver.resolve_show(&candidate, cancel).await,
        };
        let record = match resolved {
            Ok(Some(record)) => record,
            Err(Error::Cancelled) => return Outcome::Interrupted { group },
            Ok(None) => {
                let err = Error::ResolutionNotFound(group.name.clone());
                tracing::warn!("{}", err);
                return Outcome::Quarantine {
                    group,
                    state,
                    reason: err.to_string(),
                };
            }
            Err(e) => {
                tracing::warn!("Catalog lookup for '{}' failed: {}", group.name, e);
                return Outcome::Quarantine {
                    group,
                    state,
                    reason: e.to_string(),
                };
            }
        };

        match group.kind {
            MediaKind::Movie => {
                let state = step!(state, GroupState::Planning);
                let group = self.probe(group).await;
                let plan = planner::plan_movie(&record, &group, root, self.options.plan_options());
                Outcome::Planned {
                    group,
                    state,
                    plan,
                    quarantine: Vec::new(),
                }
            }
            MediaKind::TvShow => self.prepare_show(group, state, record, root, cancel).await,
        }
    }

    async fn prepare_show(
        &self,
        group: SourceGroup,
        state: GroupState,
        record: MediaRecord,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Outcome {
        let group = self.probe(group).await;
        let buckets = planner::group_episodes(&group.files);

        // Only seasons that actually have files are looked up
        let wanted: BTreeSet<u16> = buckets.episodes.keys().map(|k| k.season).collect();
        let mut seasons: BTreeMap<u16, SeasonRecord> = BTreeMap::new();
        for number in wanted {
            if cancel.is_cancelled() {
                return Outcome::Interrupted { group };
            }
            match self
                .resolver
                .resolve_season(record.external_id, number, cancel)
                .await
            {
                Ok(Some(season)) => {
                    seasons.insert(number, season);
                }
                Err(Error::Cancelled) => return Outcome::Interrupted { group },
                Ok(None) => tracing::warn!(
                    "Season {} of '{}' not found in catalog",
                    number,
                    record.original_title
                ),
                Err(e) => tracing::warn!(
                    "Season {} lookup of '{}' failed: {}",
                    number,
                    record.original_title,
                    e
                ),
            }
        }

        let state = match state.advance(GroupState::Planning) {
            Ok(s) => s,
            Err(e) => {
                return Outcome::Quarantine {
                    group,
                    state,
                    reason: e.to_string(),
                }
            }
        };
        let show = planner::plan_show(&record, &seasons, &buckets, root, self.options.plan_options());

        if !show.has_episodes() {
            // Nothing organizable: keep the folder intact in quarantine
            let reason = show
                .quarantine
                .first()
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| "no episode files".to_string());
            return Outcome::Quarantine {
                group,
                state,
                reason,
            };
        }

        Outcome::Planned {
            group,
            state,
            plan: show.plan,
            quarantine: show.quarantine,
        }
    }

    /// Refine the technical properties of every file in the group.
    async fn probe(&self, mut group: SourceGroup) -> SourceGroup {
        if !self.options.probe_media {
            return group;
        }
        for file in group.files.iter_mut() {
            file.video = ffprobe::probe(&file.path, true).await;
        }
        group
    }

    /// Apply the outcome of one group to the file system. Runs sequentially.
    async fn finish(&self, outcome: Outcome, root: &Path, summary: &mut RunSummary) {
        match outcome {
            Outcome::Interrupted { group } => {
                tracing::info!("Interrupted before processing '{}'", group.name);
                summary.interrupted.push(group.name);
            }
            Outcome::Quarantine {
                group,
                state,
                reason,
            } => {
                if let Err(e) = state.advance(GroupState::Quarantined) {
                    tracing::debug!("{}", e);
                }
                self.quarantine(root, &quarantine_paths(&group), summary).await;
                summary.quarantine(group.name, reason);
            }
            Outcome::Planned {
                group,
                state,
                mut plan,
                quarantine,
            } => {
                let report = self.executor.execute(&mut plan).await;
                tracing::info!(
                    "Organized '{}' -> {} ({} applied, {} skipped, {} failed)",
                    group.name,
                    plan.label,
                    report.applied,
                    report.skipped,
                    report.failed
                );
                if let Ok(state) = state.advance(GroupState::Executed) {
                    tracing::debug!("'{}' is {:?}", group.name, state);
                }
                summary.report.merge(report);
                summary.organized.push(plan.label.clone());
                summary.plans.push(plan);

                if !quarantine.is_empty() {
                    let paths: Vec<PathBuf> = quarantine.iter().map(|(p, _)| p.clone()).collect();
                    self.quarantine(root, &paths, summary).await;
                    for (path, reason) in quarantine {
                        tracing::warn!("Quarantined {:?}: {}", path, reason);
                        summary.quarantine(path.display().to_string(), reason);
                    }
                }
            }
        }
    }

    async fn quarantine(&self, root: &Path, paths: &[PathBuf], summary: &mut RunSummary) {
        let mut plan = quarantine_plan(self.executor.fs().as_ref(), root, paths);
        let report = self.executor.execute(&mut plan).await;
        summary.report.merge(report);
        summary.plans.push(plan);
    }
}

/// Paths moved to quarantine for a whole group: the anchor, plus the sidecars
/// of a loose file that would otherwise be left behind.
fn quarantine_paths(group: &SourceGroup) -> Vec<PathBuf> {
    let mut paths = vec![group.anchor.clone()];
    if !group.owns_folder() {
        paths.extend(
            group
                .files
                .iter()
                .flat_map(|f| f.sidecars.iter())
                .cloned(),
        );
    }
    paths
}
