//! Plan executor module.
//!
//! Executes the operations of a plan in declared order:
//! - create_dir: create directories
//! - move_rename: move videos, sidecars and extras
//! - write_sidecar: write NFO documents
//! - place_artwork: fetch and write posters
//!
//! Every operation is first checked against the current file system state.
//! The same check runs in dry-run mode, where mutations land in a
//! [`DryRunFs`] overlay instead of on disk.

use crate::models::plan::{
    ExecutionReport, FailureRecord, FileOperation, OperationKind, OperationStatus, Payload, Plan,
};
use crate::services::ArtworkSource;
use crate::utils::fs::{DryRunFs, FileSystem};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// What the executor will do with one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Apply,
    /// The target already satisfies the operation.
    Skip,
    /// The operation cannot be applied in the current state.
    Fail(String),
}

/// Decide an operation against the current file system state.
pub fn decide(fs: &dyn FileSystem, op: &FileOperation) -> Decision {
    match op.kind {
        OperationKind::CreateDir => {
            if fs.is_dir(&op.target) {
                Decision::Skip
            } else if fs.exists(&op.target) {
                Decision::Fail("a file occupies the directory path".to_string())
            } else {
                Decision::Apply
            }
        }
        OperationKind::MoveRename => {
            let Some(ref source) = op.source else {
                return Decision::Fail("move without source".to_string());
            };
            match (fs.exists(source), fs.exists(&op.target)) {
                (true, false) => Decision::Apply,
                // Moved by an earlier run
                (false, true) => Decision::Skip,
                (true, true) => Decision::Fail("destination occupied".to_string()),
                (false, false) => Decision::Fail("source missing".to_string()),
            }
        }
        OperationKind::WriteSidecar | OperationKind::PlaceArtwork => {
            if fs.exists(&op.target) {
                Decision::Skip
            } else if op.payload.is_none() {
                Decision::Fail("missing payload".to_string())
            } else {
                Decision::Apply
            }
        }
    }
}

/// Applies plans to a file system.
pub struct Executor {
    fs: Arc<dyn FileSystem>,
    artwork: Option<Arc<dyn ArtworkSource>>,
    dry_run: bool,
}

impl Executor {
    /// Create an executor. In dry-run mode `fs` is wrapped in an overlay and
    /// never mutated.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        artwork: Option<Arc<dyn ArtworkSource>>,
        dry_run: bool,
    ) -> Self {
        let fs: Arc<dyn FileSystem> = if dry_run {
            Arc::new(DryRunFs::new(fs))
        } else {
            fs
        };
        Self {
            fs,
            artwork,
            dry_run,
        }
    }

    /// The file system operations are applied to (the overlay in dry-run mode).
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute a plan, updating each entry's status.
    ///
    /// A failed operation does not stop the plan and nothing is rolled back.
    pub async fn execute(&self, plan: &mut Plan) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        tracing::debug!("Executing plan '{}' ({} operations)", plan.label, plan.len());

        for entry in plan.entries.iter_mut() {
            let op = &entry.operation;
            let outcome = match decide(self.fs.as_ref(), op) {
                Decision::Skip => Ok(OperationStatus::Skipped),
                Decision::Fail(reason) => Err(reason),
                Decision::Apply => self
                    .apply(op)
                    .await
                    .map(|_| OperationStatus::Applied)
                    .map_err(|e| e.to_string()),
            };

            match outcome {
                Ok(status) => {
                    if status == OperationStatus::Applied {
                        report.applied += 1;
                        log_applied(op, self.dry_run);
                    } else {
                        report.skipped += 1;
                        tracing::debug!("Skipped {:?} {:?}", op.kind, op.target);
                    }
                    entry.status = status;
                    entry.error = None;
                }
                Err(reason) => {
                    tracing::warn!("Failed {:?} {:?}: {}", op.kind, op.target, reason);
                    report.failed += 1;
                    report.failures.push(FailureRecord {
                        path: op.target.clone(),
                        reason: reason.clone(),
                    });
                    entry.status = OperationStatus::Failed;
                    entry.error = Some(reason);
                }
            }
        }

        report
    }

    async fn apply(&self, op: &FileOperation) -> Result<()> {
        match op.kind {
            OperationKind::CreateDir => self.fs.create_dir_all(&op.target),
            OperationKind::MoveRename => match op.source {
                Some(ref source) => self.fs.rename(source, &op.target),
                None => Err(crate::Error::operation(&op.target, "move without source")),
            },
            OperationKind::WriteSidecar => match op.payload {
                Some(Payload::Sidecar { ref contents }) => {
                    self.fs.write(&op.target, contents.as_bytes())
                }
                _ => Err(crate::Error::operation(&op.target, "payload is not a sidecar")),
            },
            OperationKind::PlaceArtwork => match op.payload {
                Some(Payload::Artwork { ref poster_ref }) => {
                    self.place_artwork(&op.target, poster_ref).await
                }
                _ => Err(crate::Error::operation(&op.target, "payload is not artwork")),
            },
        }
    }

    async fn place_artwork(&self, target: &Path, poster_ref: &str) -> Result<()> {
        // Dry-run records the placement without fetching bytes
        if self.dry_run {
            return self.fs.write(target, &[]);
        }
        let Some(ref source) = self.artwork else {
            return Err(crate::Error::operation(target, "no artwork source configured"));
        };
        let bytes = source.fetch(poster_ref).await?;
        self.fs.write(target, &bytes)
    }
}

fn log_applied(op: &FileOperation, dry_run: bool) {
    let prefix = if dry_run { "[DRY-RUN] " } else { "" };
    match op.kind {
        OperationKind::MoveRename => tracing::debug!(
            "{}Move {:?} -> {:?}",
            prefix,
            op.source.as_deref().unwrap_or(Path::new("")),
            op.target
        ),
        _ => tracing::debug!("{}{:?} {:?}", prefix, op.kind, op.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fs::MemoryFileSystem;
    use std::path::PathBuf;

    fn plan() -> Plan {
        let mut plan = Plan::new("Avatar");
        plan.push(FileOperation::create_dir("/lib/Avatar-2009-19995"));
        plan.push(FileOperation::move_rename(
            "/lib/Avatar.mkv",
            "/lib/Avatar-2009-19995/Avatar-2009-19995.mkv",
        ));
        plan.push(FileOperation::write_sidecar(
            "/lib/Avatar-2009-19995/movie.nfo",
            "<movie/>".to_string(),
        ));
        plan
    }

    #[test]
    fn test_decide_move_states() {
        let fs = MemoryFileSystem::new();
        let op = FileOperation::move_rename("/a/x.mkv", "/b/x.mkv");

        assert_eq!(decide(&fs, &op), Decision::Fail("source missing".to_string()));
        fs.add_file("/b/x.mkv", b"x");
        assert_eq!(decide(&fs, &op), Decision::Skip);
        fs.add_file("/a/x.mkv", b"y");
        assert_eq!(decide(&fs, &op), Decision::Fail("destination occupied".to_string()));
    }

    #[test]
    fn test_decide_create_dir_over_file() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/lib/Avatar", b"x");
        let op = FileOperation::create_dir("/lib/Avatar");
        assert!(matches!(decide(&fs, &op), Decision::Fail(_)));
    }

    #[tokio::test]
    async fn test_execute_applies_in_order() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/lib/Avatar.mkv", b"video");
        let executor = Executor::new(fs.clone(), None, false);

        let mut plan = plan();
        let report = executor.execute(&mut plan).await;

        assert_eq!(report.applied, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(
            fs.read("/lib/Avatar-2009-19995/Avatar-2009-19995.mkv"),
            Some(b"video".to_vec())
        );
        assert_eq!(
            fs.read("/lib/Avatar-2009-19995/movie.nfo"),
            Some(b"<movie/>".to_vec())
        );
        assert!(plan
            .entries
            .iter()
            .all(|e| e.status == OperationStatus::Applied));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_plan() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/lib/Avatar.mkv", b"video");
        fs.deny("/lib/Avatar-2009-19995/Avatar-2009-19995.mkv");
        let executor = Executor::new(fs.clone(), None, false);

        let mut plan = plan();
        let report = executor.execute(&mut plan).await;

        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(plan.entries[1].status, OperationStatus::Failed);
        assert!(fs.read("/lib/Avatar.mkv").is_some());
        assert_eq!(
            report.failures[0].path,
            PathBuf::from("/lib/Avatar-2009-19995/Avatar-2009-19995.mkv")
        );
    }

    #[tokio::test]
    async fn test_dry_run_artwork_is_not_fetched() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/lib");
        let executor = Executor::new(fs.clone(), None, true);

        let mut plan = Plan::new("poster");
        plan.push(FileOperation::place_artwork("/lib/poster.jpg", "/p.jpg".to_string()));
        let report = executor.execute(&mut plan).await;

        assert_eq!(report.applied, 1);
        assert!(executor.fs().exists(Path::new("/lib/poster.jpg")));
        assert!(!fs.exists(Path::new("/lib/poster.jpg")));
    }

    #[tokio::test]
    async fn test_real_artwork_without_source_fails() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/lib");
        let executor = Executor::new(fs, None, false);

        let mut plan = Plan::new("poster");
        plan.push(FileOperation::place_artwork("/lib/poster.jpg", "/p.jpg".to_string()));
        let report = executor.execute(&mut plan).await;
        assert_eq!(report.failed, 1);
    }
}
