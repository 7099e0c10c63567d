//! TMDB API preflight check.

use super::CheckResult;
use crate::models::config::Config;
use crate::services::tmdb::TmdbClient;

/// Check that a TMDB key is configured and accepted.
pub async fn check(config: &Config) -> CheckResult {
    let client = match config.tmdb().and_then(TmdbClient::new) {
        Ok(c) => c,
        Err(_) => {
            return CheckResult::fail(
                "TMDB API",
                "API key not configured",
                "Set TMDB_API_KEY or [catalog].api_key in config.toml",
            )
        }
    };

    if client.verify_api_key().await {
        CheckResult::ok("TMDB API", "connected")
    } else {
        CheckResult::fail(
            "TMDB API",
            "invalid API key or no connection",
            "Check your TMDB_API_KEY and network connection",
        )
    }
}
