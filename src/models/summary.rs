//! Run summary model.

use super::media::MediaKind;
use super::plan::{ExecutionReport, Plan};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One quarantined item and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Group name or quarantined path.
    pub name: String,
    pub reason: String,
}

/// Outcome of one run, printed at the end and saved as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub root: PathBuf,
    pub kind: MediaKind,
    pub dry_run: bool,
    /// Target folder names of organized groups.
    pub organized: Vec<String>,
    pub quarantined: Vec<QuarantineEntry>,
    /// Groups left untouched because the run was cancelled.
    pub interrupted: Vec<String>,
    /// Operation counts over all plans, quarantine and cleanup.
    pub report: ExecutionReport,
    /// Items moved to `Unwanted` by the cleanup sweep.
    pub unwanted: usize,
    /// Executed plans with per-operation status.
    pub plans: Vec<Plan>,
}

impl RunSummary {
    pub fn new(root: &Path, kind: MediaKind, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            root: root.to_path_buf(),
            kind,
            dry_run,
            organized: Vec::new(),
            quarantined: Vec::new(),
            interrupted: Vec::new(),
            report: ExecutionReport::default(),
            unwanted: 0,
            plans: Vec::new(),
        }
    }

    pub fn quarantine(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.quarantined.push(QuarantineEntry {
            name: name.into(),
            reason: reason.into(),
        });
    }

    pub fn was_interrupted(&self) -> bool {
        !self.interrupted.is_empty()
    }

    /// Report file name: `run-<timestamp>-<short id>.json`.
    pub fn file_name(&self) -> String {
        let id = self.run_id.simple().to_string();
        format!(
            "run-{}-{}.json",
            self.started_at.format("%Y%m%d-%H%M%S"),
            &id[..8]
        )
    }

    /// Save the summary as pretty JSON under `dir`, returning the file path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut summary = RunSummary::new(Path::new("/lib"), MediaKind::Movie, true);
        summary.organized.push("Avatar-阿凡达-2009-tt0499549-19995".to_string());
        summary.quarantine("x.mkv", "low confidence 0.10");

        let path = summary.save(dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("run-"));

        let loaded: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.run_id, summary.run_id);
        assert_eq!(loaded.quarantined.len(), 1);
        assert!(loaded.dry_run);
    }
}
