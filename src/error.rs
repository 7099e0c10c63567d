//! Error types for the reorganization engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the reorganization engine.
#[derive(Error, Debug)]
pub enum Error {
    // Preflight errors
    #[error("TMDB API key not configured. Set TMDB_API_KEY environment variable")]
    TmdbApiKeyMissing,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Operation failed on {path}: {reason}")]
    OperationFailure { path: PathBuf, reason: String },

    // Classification errors
    #[error("Classification of '{name}' failed: {reason}")]
    Classification { name: String, reason: String },

    #[error("AI backend error: {0}")]
    AiBackend(String),

    // Resolution errors
    #[error("No catalog match for '{0}'")]
    ResolutionNotFound(String),

    #[error("Catalog backend error: {0}")]
    ResolverBackend(String),

    // Planning errors
    #[error("Duplicate episode S{season:02}E{episode:02} claimed by {} files", .sources.len())]
    DuplicateEpisodeConflict {
        season: u16,
        episode: u16,
        sources: Vec<PathBuf>,
    },

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Interrupted")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create an operation failure for a path.
    pub fn operation<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Error::OperationFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry policy may try the failed call again.
    ///
    /// Transport failures, non-2xx backend responses and timeouts are transient.
    /// Malformed payloads are not: asking again would not make them valid.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::AiBackend(_) | Error::ResolverBackend(_) | Error::Timeout(_) => true,
            Error::Http(e) => !e.is_decode(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        assert!(Error::AiBackend("503".into()).is_transient());
        assert!(Error::ResolverBackend("502".into()).is_transient());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!Error::other("bad").is_transient());
        assert!(!Error::Cancelled.is_transient());
        assert!(!Error::Classification {
            name: "x".into(),
            reason: "y".into()
        }
        .is_transient());
    }

    #[test]
    fn test_duplicate_episode_message() {
        let err = Error::DuplicateEpisodeConflict {
            season: 1,
            episode: 1,
            sources: vec![PathBuf::from("a.mkv"), PathBuf::from("b.mkv")],
        };
        assert_eq!(err.to_string(), "Duplicate episode S01E01 claimed by 2 files");
    }
}
