//! TMDB API client.

use super::{ArtworkSource, CatalogBackend, CatalogDetails, CatalogHit, SeasonDetail};
use crate::models::media::{CastMember, Country, MediaKind, RecordExtras};
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p";

/// Actors kept per movie, in billing order.
pub const MAX_CAST: usize = 20;

/// TMDB client configuration.
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    /// API key or Bearer token (JWT)
    pub api_key: String,
    pub language: String,
    /// Whether to use Bearer token authentication (API v4 style)
    pub use_bearer: bool,
    pub base_url: String,
    pub image_base_url: String,
    /// Poster size segment (e.g., "w500", "original").
    pub poster_size: String,
    pub timeout_secs: u64,
}

/// TMDB API client.
pub struct TmdbClient {
    config: TmdbConfig,
    client: reqwest::Client,
}

/// Movie search result.
#[derive(Debug, Deserialize)]
struct MovieSearchResult {
    results: Vec<MovieSearchItem>,
}

/// Movie search item.
#[derive(Debug, Deserialize)]
struct MovieSearchItem {
    id: u64,
    title: String,
    original_title: String,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

/// Movie details with credits appended.
#[derive(Debug, Deserialize)]
struct MovieDetails {
    imdb_id: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    genres: Option<Vec<Named>>,
    production_countries: Option<Vec<ProductionCountry>>,
    production_companies: Option<Vec<Named>>,
    credits: Option<Credits>,
}

/// Genre or production company.
#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

/// Movie credits.
#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CreditCast>,
    #[serde(default)]
    crew: Vec<CreditCrew>,
}

/// Cast member.
#[derive(Debug, Deserialize)]
struct CreditCast {
    name: String,
    character: Option<String>,
    order: Option<u32>,
}

/// Crew member.
#[derive(Debug, Deserialize)]
struct CreditCrew {
    name: String,
    job: String,
}

/// Production country.
#[derive(Debug, Deserialize)]
struct ProductionCountry {
    iso_3166_1: String,
    name: String,
}

/// TV show search result.
#[derive(Debug, Deserialize)]
struct TvSearchResult {
    results: Vec<TvSearchItem>,
}

/// TV show search item.
#[derive(Debug, Deserialize)]
struct TvSearchItem {
    id: u64,
    name: String,
    original_name: String,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

/// TV show details.
#[derive(Debug, Deserialize)]
struct TvDetails {
    production_countries: Option<Vec<ProductionCountry>>,
    origin_country: Option<Vec<String>>,
    external_ids: Option<ExternalIds>,
}

/// External IDs for a TV show.
#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// Season details.
#[derive(Debug, Deserialize)]
struct SeasonDetails {
    overview: Option<String>,
    poster_path: Option<String>,
    air_date: Option<String>,
}

/// Extract the year from a `YYYY-MM-DD` date.
pub fn year_of(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Treat empty strings from the API as absent.
fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// Build a request with proper authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        if self.config.use_bearer {
            request.header("Authorization", format!("Bearer {}", self.config.api_key))
        } else {
            request
        }
    }

    /// Build URL with optional api_key parameter (only for v3 style).
    fn build_url(&self, path: &str, extra_params: &str) -> String {
        let language = urlencoding::encode(&self.config.language);
        if self.config.use_bearer {
            format!(
                "{}/{}?language={}{}",
                self.config.base_url, path, language, extra_params
            )
        } else {
            format!(
                "{}/{}?api_key={}&language={}{}",
                self.config.base_url, path, self.config.api_key, language, extra_params
            )
        }
    }

    /// GET and decode; `Ok(None)` on 404, `ResolverBackend` on other failures.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let resp = self
            .build_request(url)
            .send()
            .await
            .map_err(|e| crate::Error::ResolverBackend(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(crate::Error::ResolverBackend(format!(
                "TMDB returned status {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| crate::Error::ResolverBackend(e.to_string()))?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Verify API key is valid.
    pub async fn verify_api_key(&self) -> bool {
        let url = if self.config.use_bearer {
            format!("{}/authentication", self.config.base_url)
        } else {
            format!(
                "{}/authentication?api_key={}",
                self.config.base_url, self.config.api_key
            )
        };

        match self.build_request(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn search_movie(&self, query: &str, year: Option<u16>) -> Result<Vec<CatalogHit>> {
        let year_param = year.map(|y| format!("&year={}", y)).unwrap_or_default();
        let url = self.build_url(
            "search/movie",
            &format!("&query={}{}", urlencoding::encode(query), year_param),
        );

        let resp: Option<MovieSearchResult> = self.get_json(&url).await?;
        Ok(resp
            .map(|r| r.results)
            .unwrap_or_default()
            .into_iter()
            .map(|item| CatalogHit {
                id: item.id,
                release_year: year_of(item.release_date.as_deref()),
                title: item.title,
                original_title: item.original_title,
                overview: non_empty(item.overview),
                poster_ref: non_empty(item.poster_path),
                imdb_id: None,
            })
            .collect())
    }

    async fn search_tv(&self, query: &str, year: Option<u16>) -> Result<Vec<CatalogHit>> {
        let year_param = year
            .map(|y| format!("&first_air_date_year={}", y))
            .unwrap_or_default();
        let url = self.build_url(
            "search/tv",
            &format!("&query={}{}", urlencoding::encode(query), year_param),
        );

        let resp: Option<TvSearchResult> = self.get_json(&url).await?;
        Ok(resp
            .map(|r| r.results)
            .unwrap_or_default()
            .into_iter()
            .map(|item| CatalogHit {
                id: item.id,
                release_year: year_of(item.first_air_date.as_deref()),
                title: item.name,
                original_title: item.original_name,
                overview: non_empty(item.overview),
                poster_ref: non_empty(item.poster_path),
                imdb_id: None,
            })
            .collect())
    }

    /// Get poster image URL.
    pub fn poster_url(&self, poster_ref: &str) -> String {
        format!(
            "{}/{}{}",
            self.config.image_base_url, self.config.poster_size, poster_ref
        )
    }

    /// Get full-size backdrop URL.
    pub fn backdrop_url(&self, backdrop_ref: &str) -> String {
        format!("{}/original{}", self.config.image_base_url, backdrop_ref)
    }

    fn movie_extras(&self, details: &mut MovieDetails) -> RecordExtras {
        let names = |items: Option<Vec<Named>>| -> Vec<String> {
            items
                .unwrap_or_default()
                .into_iter()
                .map(|n| n.name)
                .filter(|n| !n.trim().is_empty())
                .collect()
        };

        let credits = details.credits.take().unwrap_or_default();
        let directors = credits
            .crew
            .into_iter()
            .filter(|c| c.job == "Director")
            .map(|c| c.name)
            .collect();
        let mut cast = credits.cast;
        cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));

        RecordExtras {
            release_date: non_empty(details.release_date.take()),
            runtime: details.runtime.filter(|r| *r > 0),
            rating: details.vote_average.filter(|_| details.vote_count.unwrap_or(0) > 0),
            votes: details.vote_count.filter(|v| *v > 0),
            genres: names(details.genres.take()),
            studios: names(details.production_companies.take()),
            directors,
            cast: cast
                .into_iter()
                .take(MAX_CAST)
                .map(|c| CastMember {
                    name: c.name,
                    role: non_empty(c.character),
                })
                .collect(),
            thumb_url: non_empty(details.poster_path.take()).map(|p| self.poster_url(&p)),
            fanart_url: non_empty(details.backdrop_path.take()).map(|p| self.backdrop_url(&p)),
        }
    }
}

fn to_countries(countries: Option<Vec<ProductionCountry>>) -> Vec<Country> {
    countries
        .unwrap_or_default()
        .into_iter()
        .map(|c| Country {
            code: c.iso_3166_1,
            name: c.name,
        })
        .collect()
}

#[async_trait]
impl CatalogBackend for TmdbClient {
    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<CatalogHit>> {
        match kind {
            MediaKind::Movie => self.search_movie(query, year).await,
            MediaKind::TvShow => self.search_tv(query, year).await,
        }
    }

    async fn details(&self, kind: MediaKind, id: u64) -> Result<CatalogDetails> {
        match kind {
            MediaKind::Movie => {
                let url = self.build_url(&format!("movie/{}", id), "&append_to_response=credits");
                let mut details: MovieDetails = self.get_json(&url).await?.ok_or_else(|| {
                    crate::Error::ResolverBackend(format!("movie {} disappeared", id))
                })?;
                let extras = self.movie_extras(&mut details);
                Ok(CatalogDetails {
                    imdb_id: non_empty(details.imdb_id),
                    countries: to_countries(details.production_countries),
                    extras,
                })
            }
            MediaKind::TvShow => {
                let url = self.build_url(
                    &format!("tv/{}", id),
                    "&append_to_response=external_ids",
                );
                let details: TvDetails = self.get_json(&url).await?.ok_or_else(|| {
                    crate::Error::ResolverBackend(format!("tv show {} disappeared", id))
                })?;
                let mut countries = to_countries(details.production_countries);
                if countries.is_empty() {
                    // origin_country only carries codes
                    countries = details
                        .origin_country
                        .unwrap_or_default()
                        .into_iter()
                        .map(|code| Country {
                            name: code.clone(),
                            code,
                        })
                        .collect();
                }
                Ok(CatalogDetails {
                    imdb_id: non_empty(details.external_ids.and_then(|e| e.imdb_id)),
                    countries,
                    extras: RecordExtras::default(),
                })
            }
        }
    }

    async fn season(&self, show_id: u64, season_number: u16) -> Result<Option<SeasonDetail>> {
        let url = self.build_url(&format!("tv/{}/season/{}", show_id, season_number), "");
        let season: Option<SeasonDetails> = self.get_json(&url).await?;
        Ok(season.map(|s| SeasonDetail {
            air_year: year_of(s.air_date.as_deref()),
            overview: non_empty(s.overview),
            poster_ref: non_empty(s.poster_path),
        }))
    }
}

#[async_trait]
impl ArtworkSource for TmdbClient {
    async fn fetch(&self, poster_ref: &str) -> Result<Vec<u8>> {
        let url = self.poster_url(poster_ref);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(crate::Error::other(format!(
                "Poster download failed with status: {}",
                resp.status()
            )));
        }
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}
