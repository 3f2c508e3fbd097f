//! TMDB (The Movie Database) metadata client
//!
//! API Flow:
//! 1. Search: /search/movie → candidates for the add flow
//! 2. Genres: /genre/movie/list → taxonomy, cached for the process lifetime
//! 3. Recommendations: /movie/{id}/recommendations and /discover/movie
//!
//! Every request first takes a slot from the shared rate limiter.

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{ApiGenreList, ApiResultsPage, Candidate, FilmId, GenreId, GenreTaxonomy},
    services::{metadata::MetadataProvider, rate_limiter::RateLimiter},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    rate_limiter: Arc<RateLimiter>,
    /// Filled by the first successful genre fetch, never invalidated
    genre_cache: OnceCell<GenreTaxonomy>,
}

impl TmdbClient {
    pub fn new(config: &Config, rate_limiter: Arc<RateLimiter>) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.http_timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_api_url.trim_end_matches('/').to_string(),
            language: config.tmdb_language.clone(),
            rate_limiter,
            genre_cache: OnceCell::new(),
        })
    }

    /// Rate-limited GET returning the decoded JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MetadataUnavailable(format!(
                "TMDB returned status {} for {}: {}",
                status, path, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn get_candidates(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<Vec<Candidate>> {
        let page: ApiResultsPage = self.get_json(path, params).await?;
        Ok(page.results.into_iter().map(Candidate::from).collect())
    }

    async fn fetch_genres(&self) -> AppResult<GenreTaxonomy> {
        let list: ApiGenreList = self.get_json("genre/movie/list", &[]).await?;
        let taxonomy = GenreTaxonomy::from(list);

        if taxonomy.is_empty() {
            return Err(AppError::MetadataUnavailable(
                "TMDB returned an empty genre list".to_string(),
            ));
        }

        tracing::info!(genres = taxonomy.len(), "Genre taxonomy loaded");
        Ok(taxonomy)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    async fn search(&self, title: &str) -> AppResult<Vec<Candidate>> {
        let start = Instant::now();
        let results = self
            .get_candidates("search/movie", &[("query", title.to_string())])
            .await?;

        tracing::info!(
            query = %title,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Film search completed"
        );

        Ok(results)
    }

    async fn genres(&self) -> GenreTaxonomy {
        match self.genre_cache.get_or_try_init(|| self.fetch_genres()).await {
            Ok(taxonomy) => taxonomy.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load genre taxonomy");
                GenreTaxonomy::new()
            }
        }
    }

    async fn recommendations_for_film(
        &self,
        film_id: FilmId,
        page: u32,
    ) -> AppResult<Vec<Candidate>> {
        let start = Instant::now();
        let path = format!("movie/{}/recommendations", film_id);
        let results = self
            .get_candidates(&path, &[("page", page.to_string())])
            .await?;

        tracing::info!(
            film_id,
            page,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Film recommendations fetched"
        );

        Ok(results)
    }

    async fn recommendations_for_genre(
        &self,
        genre_id: GenreId,
        page: u32,
    ) -> AppResult<Vec<Candidate>> {
        let start = Instant::now();
        let results = self
            .get_candidates(
                "discover/movie",
                &[("with_genres", genre_id.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            genre_id,
            page,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Genre recommendations fetched"
        );

        Ok(results)
    }
}
