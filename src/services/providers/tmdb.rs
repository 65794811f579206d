/// TMDB API provider
///
/// Listing endpoints used:
/// 1. Now playing: /movie/now_playing → mirrored into the catalog
/// 2. Popular: /movie/popular and /discover/movie → passthrough listings
/// 3. Detail and credits: /movie/{id}, /movie/{id}/credits → raw passthrough
///
/// Transport errors, 429 and 5xx responses are retried with exponential
/// backoff; any other non-success status fails immediately.
use crate::{
    cached,
    config::{CatalogPolicy, Config},
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{TmdbMovie, TmdbPage},
    services::providers::MovieSource,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const PASSTHROUGH_CACHE_TTL: u64 = 86400; // 1 day
const LISTING_CACHE_TTL: u64 = 600; // 10 minutes
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    policy: CatalogPolicy,
    max_retries: u32,
    retry_delay: Duration,
    cache: Option<Cache>,
}

impl TmdbProvider {
    /// Builds a provider with the configured timeout and retry budget
    pub fn from_config(config: &Config, cache: Option<Cache>) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.tmdb_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_api_url.trim_end_matches('/').to_string(),
            policy: config.catalog_policy(),
            max_retries: config.tmdb_max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache,
        })
    }

    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        policy: CatalogPolicy,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            policy,
            max_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache: None,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * 2u32.saturating_pow(attempt)
    }

    /// GETs `path` and decodes the JSON body, retrying transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);
        let mut attempt = 0;

        loop {
            let result = self
                .http_client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(query)
                .send()
                .await;

            let failure = match result {
                Ok(response) if response.status().is_success() => {
                    return response.json::<T>().await.map_err(|e| {
                        AppError::ExternalApi(format!(
                            "Failed to parse TMDB response from {}: {}",
                            path,
                            e.without_url()
                        ))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = AppError::ExternalApi(format!(
                        "TMDB returned status {} for {}: {}",
                        status, path, body
                    ));
                    if !Self::is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
                // The URL carries the API key, keep it out of errors and logs
                Err(e) => AppError::HttpClient(e.without_url()),
            };

            if attempt >= self.max_retries {
                tracing::error!(
                    path = %path,
                    attempts = attempt + 1,
                    error = %failure,
                    "TMDB request failed"
                );
                return Err(failure);
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                path = %path,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "TMDB request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn listing_query(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("region", self.policy.region.clone()),
            ("language", self.policy.language.clone()),
            ("page", page.to_string()),
        ]
    }
}

#[async_trait::async_trait]
impl MovieSource for TmdbProvider {
    async fn now_playing(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>> {
        let mut query = self.listing_query(page);
        query.push(("sort_by", self.policy.sort_by.clone()));

        let listing: TmdbPage<TmdbMovie> = self.get_json("/movie/now_playing", &query).await?;

        tracing::debug!(
            page,
            total_pages = listing.total_pages,
            results = listing.results.len(),
            provider = "tmdb",
            "Now-playing page fetched"
        );

        Ok(listing)
    }

    async fn popular(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::PopularPage {
                region: self.policy.region.clone(),
                page,
            },
            LISTING_CACHE_TTL,
            async move {
                self.get_json("/movie/popular", &self.listing_query(page))
                    .await
            }
        )
    }

    async fn discover_by_genre(
        &self,
        genre_id: i32,
        page: u32,
    ) -> AppResult<TmdbPage<TmdbMovie>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::DiscoverPage { genre_id, page },
            LISTING_CACHE_TTL,
            async move {
                let mut query = self.listing_query(page);
                query.push(("with_genres", genre_id.to_string()));
                self.get_json("/discover/movie", &query).await
            }
        )
    }

    async fn credits(&self, tmdb_id: i64) -> AppResult<serde_json::Value> {
        let language = self.policy.detail_language.clone();
        cached!(
            self.cache.as_ref(),
            CacheKey::Credits {
                tmdb_id,
                language: language.clone(),
            },
            PASSTHROUGH_CACHE_TTL,
            async move {
                self.get_json(
                    &format!("/movie/{}/credits", tmdb_id),
                    &[("language", language)],
                )
                .await
            }
        )
    }

    async fn detail(&self, tmdb_id: i64) -> AppResult<serde_json::Value> {
        let language = self.policy.detail_language.clone();
        cached!(
            self.cache.as_ref(),
            CacheKey::Detail {
                tmdb_id,
                language: language.clone(),
            },
            PASSTHROUGH_CACHE_TTL,
            async move {
                self.get_json(&format!("/movie/{}", tmdb_id), &[("language", language)])
                    .await
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
