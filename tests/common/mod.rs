//! Mock backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use media_reorg::models::media::{Country, MediaKind, RecordExtras};
use media_reorg::services::{
    AiBackend, ArtworkSource, CatalogBackend, CatalogDetails, CatalogHit, SeasonDetail,
};
use media_reorg::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ========== AI ==========

/// Answers prompts by the first registered name fragment they contain.
#[derive(Default)]
pub struct MockAi {
    answers: Vec<(String, String)>,
    pub calls: AtomicUsize,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts mentioning `fragment` with raw JSON.
    pub fn answer(mut self, fragment: &str, json: &str) -> Self {
        self.answers.push((fragment.to_string(), json.to_string()));
        self
    }

    pub fn movie(self, fragment: &str, title: &str, original: &str, year: u16, confidence: f32) -> Self {
        let json = format!(
            r#"{{"type":"movie","title":"{}","original_title":"{}","year":{},"confidence":{}}}"#,
            title, original, year, confidence
        );
        self.answer(fragment, &json)
    }

    pub fn show(self, fragment: &str, title: &str, original: &str, confidence: f32) -> Self {
        let json = format!(
            r#"{{"type":"tv_show","title":"{}","original_title":"{}","year":null,"confidence":{}}}"#,
            title, original, confidence
        );
        self.answer(fragment, &json)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiBackend for MockAi {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, json)| json.clone())
            .ok_or_else(|| Error::AiBackend("connection refused".to_string()))
    }
}

// ========== Catalog ==========

/// Catalog answering from registered hits, recording every call.
#[derive(Default)]
pub struct MockCatalog {
    hits: HashMap<(String, Option<u16>), Vec<CatalogHit>>,
    details: HashMap<u64, CatalogDetails>,
    seasons: HashMap<(u64, u16), SeasonDetail>,
    failing_seasons: Vec<(u64, u16)>,
    failing_searches: bool,
    delay: Option<Duration>,
    pub searches: Mutex<Vec<(String, Option<u16>)>>,
    pub detail_calls: AtomicUsize,
    pub season_calls: Mutex<Vec<(u64, u16)>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(mut self, query: &str, year: Option<u16>, hit: CatalogHit) -> Self {
        self.hits
            .entry((query.to_string(), year))
            .or_default()
            .push(hit);
        self
    }

    pub fn details(mut self, id: u64, imdb: &str, country: Option<(&str, &str)>) -> Self {
        self.details.insert(
            id,
            CatalogDetails {
                imdb_id: Some(imdb.to_string()),
                countries: country
                    .map(|(code, name)| {
                        vec![Country {
                            code: code.to_string(),
                            name: name.to_string(),
                        }]
                    })
                    .unwrap_or_default(),
                extras: RecordExtras::default(),
            },
        );
        self
    }

    /// Attach descriptive fields to a registered `details` entry.
    pub fn extras(mut self, id: u64, extras: RecordExtras) -> Self {
        self.details.entry(id).or_default().extras = extras;
        self
    }

    pub fn season(mut self, show_id: u64, number: u16, air_year: u16) -> Self {
        self.seasons.insert(
            (show_id, number),
            SeasonDetail {
                air_year: Some(air_year),
                overview: Some(format!("Season {} overview", number)),
                poster_ref: Some(format!("/season{}.jpg", number)),
            },
        );
        self
    }

    pub fn failing_season(mut self, show_id: u64, number: u16) -> Self {
        self.failing_seasons.push((show_id, number));
        self
    }

    /// Fail every search with a backend error.
    pub fn failing_search(mut self) -> Self {
        self.failing_searches = true;
        self
    }

    /// Delay every search, to widen race windows.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_log(&self) -> Vec<(String, Option<u16>)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn season_log(&self) -> Vec<(u64, u16)> {
        self.season_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogBackend for MockCatalog {
    async fn search(
        &self,
        _kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<CatalogHit>> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), year));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_searches {
            return Err(Error::ResolverBackend("503 Service Unavailable".to_string()));
        }
        Ok(self
            .hits
            .get(&(query.to_string(), year))
            .cloned()
            .unwrap_or_default())
    }

    async fn details(&self, _kind: MediaKind, id: u64) -> Result<CatalogDetails> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.details.get(&id).cloned().unwrap_or_default())
    }

    async fn season(&self, show_id: u64, season_number: u16) -> Result<Option<SeasonDetail>> {
        self.season_calls
            .lock()
            .unwrap()
            .push((show_id, season_number));
        if self.failing_seasons.contains(&(show_id, season_number)) {
            return Err(Error::ResolverBackend("503 Service Unavailable".to_string()));
        }
        Ok(self.seasons.get(&(show_id, season_number)).cloned())
    }
}

/// A search hit with the given identity.
pub fn hit(id: u64, title: &str, original: &str, year: u16) -> CatalogHit {
    CatalogHit {
        id,
        title: title.to_string(),
        original_title: original.to_string(),
        release_year: Some(year),
        overview: Some(format!("{} overview", original)),
        poster_ref: Some(format!("/poster{}.jpg", id)),
        imdb_id: None,
    }
}

// ========== Artwork ==========

/// Returns fixed bytes for every poster.
#[derive(Default)]
pub struct MockArtwork {
    pub fetches: AtomicUsize,
}

#[async_trait]
impl ArtworkSource for MockArtwork {
    async fn fetch(&self, _poster_ref: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(b"JPEG".to_vec())
    }
}
