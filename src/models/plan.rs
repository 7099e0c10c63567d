//! Plan data model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of filesystem operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateDir,
    MoveRename,
    WriteSidecar,
    PlaceArtwork,
}

/// Data carried by write operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Full sidecar document text.
    Sidecar { contents: String },
    /// Catalog reference of the image to fetch.
    Artwork { poster_ref: String },
}

/// A single pending filesystem operation. Pure data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOperation {
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub target: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl FileOperation {
    pub fn create_dir(target: impl Into<PathBuf>) -> Self {
        Self {
            kind: OperationKind::CreateDir,
            source: None,
            target: target.into(),
            payload: None,
        }
    }

    pub fn move_rename(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind: OperationKind::MoveRename,
            source: Some(source.into()),
            target: target.into(),
            payload: None,
        }
    }

    pub fn write_sidecar(target: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            kind: OperationKind::WriteSidecar,
            source: None,
            target: target.into(),
            payload: Some(Payload::Sidecar { contents }),
        }
    }

    pub fn place_artwork(target: impl Into<PathBuf>, poster_ref: String) -> Self {
        Self {
            kind: OperationKind::PlaceArtwork,
            source: None,
            target: target.into(),
            payload: Some(Payload::Artwork { poster_ref }),
        }
    }
}

/// Execution status of one plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Applied,
    Skipped,
    Failed,
}

/// An operation together with its execution status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub operation: FileOperation,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered list of operations for one resolved item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Human readable label (usually the target folder name).
    pub label: String,
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    /// Append an operation in pending state.
    pub fn push(&mut self, operation: FileOperation) {
        self.entries.push(PlanEntry {
            operation,
            status: OperationStatus::Pending,
            error: None,
        });
    }

    /// Append every entry of `other`, keeping order.
    pub fn extend(&mut self, other: Plan) {
        self.entries.extend(other.entries);
    }

    pub fn operations(&self) -> impl Iterator<Item = &FileOperation> {
        self.entries.iter().map(|e| &e.operation)
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations().filter(|op| op.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any operation targets `path`.
    pub fn targets(&self, path: &Path) -> bool {
        self.operations().any(|op| op.target == path)
    }
}

/// One failed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome counts of executing one or more plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
}

impl ExecutionReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: ExecutionReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }

    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_counts() {
        let mut plan = Plan::new("Avatar");
        plan.push(FileOperation::create_dir("/lib/Avatar"));
        plan.push(FileOperation::move_rename("/src/a.mkv", "/lib/Avatar/a.mkv"));
        plan.push(FileOperation::write_sidecar("/lib/Avatar/movie.nfo", String::new()));

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.count(OperationKind::MoveRename), 1);
        assert!(plan.targets(Path::new("/lib/Avatar/movie.nfo")));
        assert!(plan
            .entries
            .iter()
            .all(|e| e.status == OperationStatus::Pending));
    }

    #[test]
    fn test_report_merge() {
        let mut a = ExecutionReport {
            applied: 2,
            ..Default::default()
        };
        a.merge(ExecutionReport {
            applied: 1,
            skipped: 3,
            failed: 1,
            failures: vec![FailureRecord {
                path: PathBuf::from("/x"),
                reason: "destination occupied".to_string(),
            }],
        });
        assert_eq!(a.total(), 7);
        assert_eq!(a.failures.len(), 1);
    }
}
