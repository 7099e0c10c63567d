//! Metadata resolver.
//!
//! Resolves a [`ParseCandidate`] against the catalog with a four-step search
//! fallback, and resolves season detail on demand. Results (including "not
//! found") are cached for the lifetime of the resolver, which is one run.

use crate::core::retry::RetryPolicy;
use crate::models::media::{MediaKind, MediaRecord, ParseCandidate, SeasonRecord};
use crate::services::{CatalogBackend, CatalogHit};
use crate::utils::chinese;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

type Slot<T> = Arc<OnceCell<Option<T>>>;

/// Cache key for show/movie records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    kind: MediaKind,
    original_title: String,
    year: Option<u16>,
}

impl RecordKey {
    fn of(candidate: &ParseCandidate) -> Self {
        // A candidate with only a localized title is keyed by that title
        let title = if candidate.original_title.trim().is_empty() {
            &candidate.localized_title
        } else {
            &candidate.original_title
        };
        Self {
            kind: candidate.kind,
            original_title: title.trim().to_string(),
            year: candidate.year,
        }
    }
}

/// One search attempt of the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStep {
    pub query: String,
    pub year: Option<u16>,
}

/// Catalog-backed resolver with a per-run cache.
pub struct MetadataResolver {
    backend: Arc<dyn CatalogBackend>,
    retry: RetryPolicy,
    records: Mutex<HashMap<RecordKey, Slot<MediaRecord>>>,
    seasons: Mutex<HashMap<(u64, u16), Slot<SeasonRecord>>>,
}

impl MetadataResolver {
    pub fn new(backend: Arc<dyn CatalogBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            records: Mutex::new(HashMap::new()),
            seasons: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a movie candidate. `Ok(None)` means the catalog has no match.
    pub async fn resolve_movie(
        &self,
        candidate: &ParseCandidate,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaRecord>> {
        self.expect_kind(candidate, MediaKind::Movie)?;
        self.resolve(candidate, cancel).await
    }

    /// Resolve a show candidate. Seasons are resolved separately.
    pub async fn resolve_show(
        &self,
        candidate: &ParseCandidate,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaRecord>> {
        self.expect_kind(candidate, MediaKind::TvShow)?;
        self.resolve(candidate, cancel).await
    }

    /// Resolve a candidate of either kind.
    ///
    /// Fails with [`Error::Cancelled`] when `cancel` fires before the chain
    /// completes; no search or details call starts after that point and
    /// nothing is cached.
    pub async fn resolve(
        &self,
        candidate: &ParseCandidate,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaRecord>> {
        let slot = {
            let mut records = self
                .records
                .lock()
                .map_err(|_| Error::other("resolver cache poisoned"))?;
            records
                .entry(RecordKey::of(candidate))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        // Concurrent callers for the same key wait on the first lookup.
        // A failed lookup leaves the slot empty so a later caller may try again.
        let record = slot
            .get_or_try_init(|| self.lookup(candidate, cancel))
            .await?;
        Ok(record.clone())
    }

    /// Resolve one season of a show. A season without an air date is not found.
    pub async fn resolve_season(
        &self,
        show_id: u64,
        season_number: u16,
        cancel: &CancellationToken,
    ) -> Result<Option<SeasonRecord>> {
        let slot = {
            let mut seasons = self
                .seasons
                .lock()
                .map_err(|_| Error::other("resolver cache poisoned"))?;
            seasons
                .entry((show_id, season_number))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let season = slot
            .get_or_try_init(|| self.lookup_season(show_id, season_number, cancel))
            .await?;
        Ok(season.clone())
    }

    fn expect_kind(&self, candidate: &ParseCandidate, kind: MediaKind) -> Result<()> {
        if candidate.kind == kind {
            Ok(())
        } else {
            Err(Error::other(format!(
                "expected a {} candidate, got a {}",
                kind, candidate.kind
            )))
        }
    }

    async fn lookup(
        &self,
        candidate: &ParseCandidate,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaRecord>> {
        for step in search_steps(candidate) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            tracing::debug!(
                "Searching {} '{}' (year: {:?})",
                candidate.kind,
                step.query,
                step.year
            );
            let hits = self
                .retry
                .run("catalog search", cancel, || {
                    self.backend.search(candidate.kind, &step.query, step.year)
                })
                .await?;

            // Hits without a release year or id cannot name a folder
            let eligible: Vec<CatalogHit> = hits
                .into_iter()
                .filter(|h| h.id != 0 && h.release_year.is_some())
                .collect();

            if let Some(best) = best_match(eligible, candidate.year) {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let details = self
                    .retry
                    .run("catalog details", cancel, || {
                        self.backend.details(candidate.kind, best.id)
                    })
                    .await?;
                let record = build_record(candidate, best, details);
                tracing::info!(
                    "Resolved '{}' -> {} ({}, id {})",
                    step.query,
                    record.original_title,
                    record.year,
                    record.external_id
                );
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    async fn lookup_season(
        &self,
        show_id: u64,
        season_number: u16,
        cancel: &CancellationToken,
    ) -> Result<Option<SeasonRecord>> {
        let detail = self
            .retry
            .run("season details", cancel, || self.backend.season(show_id, season_number))
            .await?;

        let Some(detail) = detail else {
            return Ok(None);
        };
        let Some(air_year) = detail.air_year else {
            tracing::debug!("Season {} of show {} has no air date", season_number, show_id);
            return Ok(None);
        };

        Ok(Some(SeasonRecord {
            season_number,
            air_year,
            overview: detail.overview.unwrap_or_default(),
            poster_ref: detail.poster_ref,
        }))
    }
}

/// The fallback chain for a candidate: original+year, localized+year,
/// original, localized. Blank queries and repeats are dropped.
pub fn search_steps(candidate: &ParseCandidate) -> Vec<SearchStep> {
    let original = candidate.original_title.trim();
    let localized = candidate.localized_title.trim();

    let mut proposals = Vec::with_capacity(4);
    if let Some(year) = candidate.year {
        proposals.push((original, Some(year)));
        proposals.push((localized, Some(year)));
    }
    proposals.push((original, None));
    proposals.push((localized, None));

    let mut steps: Vec<SearchStep> = Vec::new();
    for (query, year) in proposals {
        if query.is_empty() {
            continue;
        }
        let duplicate = steps
            .iter()
            .any(|s| s.year == year && chinese::titles_equivalent(&s.query, query));
        if !duplicate {
            steps.push(SearchStep {
                query: query.to_string(),
                year,
            });
        }
    }
    steps
}

/// Exact-year hit first when the candidate has a year, else the first-ranked hit.
fn best_match(hits: Vec<CatalogHit>, year: Option<u16>) -> Option<CatalogHit> {
    if let Some(year) = year {
        if let Some(pos) = hits.iter().position(|h| h.release_year == Some(year)) {
            return hits.into_iter().nth(pos);
        }
    }
    hits.into_iter().next()
}

fn build_record(
    candidate: &ParseCandidate,
    hit: CatalogHit,
    details: crate::services::CatalogDetails,
) -> MediaRecord {
    // The catalog falls back to the original title when it has no translation;
    // a distinct Chinese title from the name is better than a duplicate.
    let mut localized_title = hit.title;
    if chinese::titles_equivalent(&localized_title, &hit.original_title)
        && chinese::contains_chinese(&candidate.localized_title)
        && !chinese::titles_equivalent(&candidate.localized_title, &hit.original_title)
    {
        localized_title = candidate.localized_title.trim().to_string();
    }

    MediaRecord {
        kind: candidate.kind,
        localized_title,
        original_title: hit.original_title,
        year: hit.release_year.unwrap_or_default(),
        external_id: hit.id,
        imdb_id: details.imdb_id.or(hit.imdb_id),
        overview: hit.overview.unwrap_or_default(),
        poster_ref: hit.poster_ref,
        countries: details.countries,
        extras: details.extras,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(loc: &str, orig: &str, year: Option<u16>) -> ParseCandidate {
        ParseCandidate {
            kind: MediaKind::Movie,
            localized_title: loc.to_string(),
            original_title: orig.to_string(),
            year,
            confidence: 0.9,
        }
    }

    fn hit(id: u64, year: Option<u16>) -> CatalogHit {
        CatalogHit {
            id,
            title: format!("t{}", id),
            original_title: format!("o{}", id),
            release_year: year,
            overview: None,
            poster_ref: None,
            imdb_id: None,
        }
    }

    #[test]
    fn test_search_steps_full_chain() {
        let steps = search_steps(&candidate("阿凡达", "Avatar", Some(2009)));
        let pairs: Vec<_> = steps.iter().map(|s| (s.query.as_str(), s.year)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Avatar", Some(2009)),
                ("阿凡达", Some(2009)),
                ("Avatar", None),
                ("阿凡达", None),
            ]
        );
    }

    #[test]
    fn test_search_steps_without_year() {
        let steps = search_steps(&candidate("阿凡达", "Avatar", None));
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.year.is_none()));
    }

    #[test]
    fn test_search_steps_skip_blank_and_duplicates() {
        let steps = search_steps(&candidate("Avatar", "avatar", Some(2009)));
        assert_eq!(steps.len(), 2);

        let steps = search_steps(&candidate("", "Avatar", Some(2009)));
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.query == "Avatar"));
    }

    #[test]
    fn test_best_match_prefers_exact_year() {
        let best = best_match(vec![hit(1, Some(2010)), hit(2, Some(2009))], Some(2009)).unwrap();
        assert_eq!(best.id, 2);

        let best = best_match(vec![hit(1, Some(2010)), hit(2, Some(2011))], Some(2009)).unwrap();
        assert_eq!(best.id, 1);

        let best = best_match(vec![hit(3, Some(2010))], None).unwrap();
        assert_eq!(best.id, 3);
    }

    #[test]
    fn test_localized_title_fallback() {
        let mut h = hit(19995, Some(2009));
        h.title = "Avatar".to_string();
        h.original_title = "Avatar".to_string();

        let record = build_record(
            &candidate("阿凡达", "Avatar", Some(2009)),
            h.clone(),
            Default::default(),
        );
        assert_eq!(record.localized_title, "阿凡达");

        let record = build_record(&candidate("", "Avatar", Some(2009)), h, Default::default());
        assert_eq!(record.localized_title, "Avatar");
    }
}
