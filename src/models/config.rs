//! Configuration model.
//!
//! Loaded once at startup from `<config_dir>/media_reorg/config.toml`, then
//! overridden by environment variables. The resulting value is split into the
//! immutable per-component configurations handed to constructors.

use crate::core::retry::RetryPolicy;
use crate::services::ollama::{self, OllamaConfig};
use crate::services::tmdb::{self, TmdbConfig};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI backend configuration.
    pub ai: AiSettings,
    /// Metadata catalog configuration.
    pub catalog: CatalogSettings,
    /// Pipeline tuning.
    pub processing: ProcessingSettings,
    /// Where run reports are written.
    pub reports_dir: PathBuf,
}

/// AI backend (Ollama) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub base_url: String,
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

/// Metadata catalog (TMDB) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub api_key: Option<String>,
    pub language: String,
    pub base_url: String,
    pub image_base_url: String,
    pub poster_size: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Source groups classified/resolved concurrently.
    pub batch_width: usize,
    /// Candidates below this confidence are quarantined.
    pub min_confidence: f32,
    /// Refine technical properties with ffprobe.
    pub probe_media: bool,
    /// Emit poster placement operations.
    pub download_artwork: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai: AiSettings::default(),
            catalog: CatalogSettings::default(),
            processing: ProcessingSettings::default(),
            reports_dir: dirs_config_path().join("reports"),
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: ollama::DEFAULT_BASE_URL.to_string(),
            model: ollama::DEFAULT_MODEL.to_string(),
            timeout_secs: ollama::DEFAULT_TIMEOUT_SECS,
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            language: "zh-CN".to_string(),
            base_url: tmdb::TMDB_BASE_URL.to_string(),
            image_base_url: tmdb::TMDB_IMAGE_URL.to_string(),
            poster_size: "w500".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            batch_width: 4,
            min_confidence: 0.5,
            probe_media: true,
            download_artwork: true,
        }
    }
}

impl Config {
    /// Apply environment variable overrides.
    ///
    /// - `TMDB_API_KEY`, `TMDB_LANGUAGE`
    /// - `OLLAMA_HOST`, `OLLAMA_MODEL`, `OLLAMA_TIMEOUT`
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            if !key.trim().is_empty() {
                self.catalog.api_key = Some(key);
            }
        }
        if let Ok(lang) = std::env::var("TMDB_LANGUAGE") {
            self.catalog.language = lang;
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.ai.base_url = host;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            self.ai.model = model;
        }
        if let Some(timeout) = std::env::var("OLLAMA_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.ai.timeout_secs = timeout;
        }
    }

    /// Retry policy for AI backend calls.
    pub fn ai_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.ai.max_attempts,
            Duration::from_millis(self.ai.backoff_ms),
            Duration::from_secs(self.ai.timeout_secs),
        )
    }

    /// Retry policy for catalog calls.
    pub fn catalog_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.catalog.max_attempts,
            Duration::from_millis(self.catalog.backoff_ms),
            Duration::from_secs(self.catalog.timeout_secs),
        )
    }

    /// Ollama client configuration.
    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ai.base_url.clone(),
            model: self.ai.model.clone(),
            timeout_secs: self.ai.timeout_secs,
        }
    }

    /// TMDB client configuration. Fails when no API key is configured.
    pub fn tmdb(&self) -> Result<TmdbConfig> {
        let api_key = self
            .catalog
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(crate::Error::TmdbApiKeyMissing)?;
        Ok(TmdbConfig {
            use_bearer: api_key.starts_with("eyJ"),
            api_key,
            language: self.catalog.language.clone(),
            base_url: self.catalog.base_url.clone(),
            image_base_url: self.catalog.image_base_url.clone(),
            poster_size: self.catalog.poster_size.clone(),
            timeout_secs: self.catalog.timeout_secs,
        })
    }
}

/// Get the configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_reorg")
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_config_path().join("config.toml")
}

/// Load configuration from a file, without environment overrides.
///
/// A missing file yields the defaults; a file that exists but does not parse
/// is a configuration error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
}

/// Load configuration from the default location and apply environment overrides.
pub fn load_config() -> Result<Config> {
    let mut config = load_config_from(&default_config_path())?;
    config.apply_env();
    tracing::debug!("Loaded configuration: {:?}", config.processing);
    Ok(config)
}
