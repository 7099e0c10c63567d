//! Source group model.
//!
//! A source group is the unit that gets classified as a whole: one movie
//! file-set, or one show folder with all of its nested episode files.

use super::media::{MediaKind, VideoMetadata};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One video file and the files that travel with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Full path to the video file.
    pub path: PathBuf,
    /// Subtitle files named after the video stem (`movie.zh.srt` for `movie.mkv`).
    #[serde(default)]
    pub sidecars: Vec<PathBuf>,
    /// Technical properties used for the target filename.
    #[serde(default)]
    pub video: VideoMetadata,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            sidecars: Vec::new(),
            video: VideoMetadata::default(),
        }
    }

    /// File name as a string.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Files/folders representing one movie or one show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    pub kind: MediaKind,
    /// Raw name handed to the classifier.
    pub name: String,
    /// Extra naming hint (e.g., the parent folder of a movie file).
    pub context: Option<String>,
    /// Path quarantined as a whole when the group cannot be organized.
    pub anchor: PathBuf,
    /// Video files of the group.
    pub files: Vec<SourceFile>,
    /// Loose subtitle files and subtitle folders that follow a movie into its folder.
    #[serde(default)]
    pub extras: Vec<PathBuf>,
}

impl SourceGroup {
    /// Whether the anchor is a folder owned by this group alone.
    pub fn owns_folder(&self) -> bool {
        self.files.iter().all(|f| f.path != self.anchor)
    }
}

/// Lifecycle of a source group during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    Discovered,
    Classifying,
    Resolving,
    Planning,
    Executed,
    Quarantined,
    /// Cancelled by the user before the group reached planning.
    Interrupted,
}

impl GroupState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GroupState::Executed | GroupState::Quarantined | GroupState::Interrupted
        )
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn advance(self, next: GroupState) -> crate::Result<GroupState> {
        use GroupState::*;
        let allowed = match (self, next) {
            (Discovered, Classifying) | (Classifying, Resolving) | (Resolving, Planning) => true,
            (Planning, Executed) => true,
            (Discovered | Classifying | Resolving, Interrupted) => true,
            (s, Quarantined) => !s.is_terminal(),
            _ => false,
        };
        if allowed {
            Ok(next)
        } else {
            Err(crate::Error::other(format!(
                "invalid group transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}
