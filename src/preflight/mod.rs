//! Preflight checks module.

mod ffprobe;
mod ollama;
mod tmdb;

use crate::models::config::Config;
use colored::Colorize;

/// Result of a preflight check.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    /// A failed optional check only warns.
    pub required: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl CheckResult {
    pub fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            required: true,
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn fail(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            required: true,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    pub fn warn(name: &str, message: &str, hint: &str) -> Self {
        Self {
            required: false,
            ..Self::fail(name, message, hint)
        }
    }
}

/// Run all preflight checks against the configured backends.
pub async fn run_preflight_checks(config: &Config) -> Vec<CheckResult> {
    vec![
        ffprobe::check(config.processing.probe_media),
        ollama::check(config).await,
        tmdb::check(config).await,
    ]
}

/// Print preflight check results.
pub fn print_results(results: &[CheckResult]) {
    for result in results {
        if result.success {
            println!(
                "{} {}: {}",
                "[OK]".green(),
                result.name.bold(),
                result.message
            );
            continue;
        }
        let tag = if result.required {
            "[FAIL]".red()
        } else {
            "[WARN]".yellow()
        };
        println!("{} {}: {}", tag, result.name.bold(), result.message);
        if let Some(ref hint) = result.hint {
            println!("  {} {}", "->".yellow(), hint);
        }
    }
}

/// Check if all required preflight checks passed.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.success || !r.required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail() {
        let results = vec![
            CheckResult::ok("Ollama", "running"),
            CheckResult::warn("ffprobe", "not found", "Install FFmpeg"),
        ];
        assert!(all_passed(&results));

        let results = vec![CheckResult::fail("TMDB API", "invalid API key", "Check key")];
        assert!(!all_passed(&results));
    }
}
