//! External collaborators.
//!
//! The engine talks to its backends only through the traits below, so tests
//! can substitute in-process fakes for Ollama and TMDB.

pub mod ffprobe;
pub mod ollama;
pub mod tmdb;

use crate::models::media::{Country, MediaKind, RecordExtras};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text-in, text-out AI backend.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Send a prompt and return the raw `content` of the answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// One search hit returned by the catalog, in catalog rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHit {
    pub id: u64,
    /// Localized title (in the configured catalog language).
    pub title: String,
    pub original_title: String,
    pub release_year: Option<u16>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
    pub imdb_id: Option<String>,
}

/// Detail fields not present in search hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDetails {
    pub imdb_id: Option<String>,
    pub countries: Vec<Country>,
    /// Descriptive fields; filled for movies only.
    pub extras: RecordExtras,
}

/// Catalog detail for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub air_year: Option<u16>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
}

/// Metadata catalog backend.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Search by title, optionally constrained by year.
    async fn search(&self, kind: MediaKind, query: &str, year: Option<u16>)
        -> Result<Vec<CatalogHit>>;

    /// Fetch identifiers, countries and descriptive fields for a known id.
    async fn details(&self, kind: MediaKind, id: u64) -> Result<CatalogDetails>;

    /// Fetch one season of a show. `Ok(None)` when the catalog has no such season.
    async fn season(&self, show_id: u64, season_number: u16) -> Result<Option<SeasonDetail>>;
}

/// Fetches artwork bytes by catalog reference.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn fetch(&self, poster_ref: &str) -> Result<Vec<u8>>;
}
