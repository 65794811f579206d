use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    db::{CatalogStore, GenreLookup},
    error::{AppError, AppResult},
    models::{Movie, PopularMovie, TmdbMovie, TmdbPage},
    services::{catalog_sync::DEFAULT_MAX_PAGES, providers::MovieSource},
};

/// Read side of the catalog plus the TMDB passthrough listings
pub struct CatalogService {
    source: Arc<dyn MovieSource>,
    genres: Arc<dyn GenreLookup>,
    store: Arc<dyn CatalogStore>,
    popular_pages: u32,
}

impl CatalogService {
    pub fn new(
        source: Arc<dyn MovieSource>,
        genres: Arc<dyn GenreLookup>,
        store: Arc<dyn CatalogStore>,
        popular_pages: u32,
    ) -> Self {
        Self {
            source,
            genres,
            store,
            popular_pages: popular_pages.clamp(1, DEFAULT_MAX_PAGES),
        }
    }

    /// Stored movies in rank order
    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        self.store.list_movies().await
    }

    pub async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Movie> {
        self.store
            .find_by_tmdb_id(tmdb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", tmdb_id)))
    }

    /// Fails with `NotFound` when no stored movie carries the genre
    pub async fn movies_by_genre(&self, genre_name: &str) -> AppResult<Vec<Movie>> {
        let movies = self.store.find_by_genre_name(genre_name).await?;
        if movies.is_empty() {
            return Err(AppError::NotFound(format!(
                "No movies found for genre {}",
                genre_name
            )));
        }
        Ok(movies)
    }

    pub async fn credits(&self, tmdb_id: i64) -> AppResult<serde_json::Value> {
        self.source.credits(tmdb_id).await
    }

    pub async fn detail(&self, tmdb_id: i64) -> AppResult<serde_json::Value> {
        self.source.detail(tmdb_id).await
    }

    /// First popular page, each entry flagged with whether the catalog holds it
    pub async fn popular(&self) -> AppResult<Vec<PopularMovie>> {
        let page = self.source.popular(1).await?;
        let stored = self.store.tmdb_ids().await?;

        Ok(page
            .results
            .into_iter()
            .map(|movie| PopularMovie {
                exists_in_db: stored.contains(&movie.id),
                movie,
            })
            .collect())
    }

    /// Popular entries across the configured pages that the catalog lacks
    pub async fn popular_uncached(&self) -> AppResult<Vec<PopularMovie>> {
        let source = self.source.clone();
        let pages = self
            .fetch_pages(move |page| {
                let source = source.clone();
                async move { source.popular(page).await }
            })
            .await?;
        self.only_uncached(pages).await
    }

    /// Discover listing for a locally known genre, minus stored movies
    pub async fn popular_by_genre(&self, genre_name: &str) -> AppResult<Vec<PopularMovie>> {
        let genre = self
            .genres
            .find_by_name(genre_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", genre_name)))?;

        let source = self.source.clone();
        let genre_id = genre.genre_id;
        let pages = self
            .fetch_pages(move |page| {
                let source = source.clone();
                async move { source.discover_by_genre(genre_id, page).await }
            })
            .await?;
        self.only_uncached(pages).await
    }

    /// Fetches pages 1..=popular_pages in parallel, keeping page order.
    /// The first failed page cancels the fetches still in flight.
    async fn fetch_pages<F, Fut>(&self, fetch: F) -> AppResult<Vec<TmdbMovie>>
    where
        F: Fn(u32) -> Fut,
        Fut: std::future::Future<Output = AppResult<TmdbPage<TmdbMovie>>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for page in 1..=self.popular_pages {
            let fut = fetch(page);
            tasks.spawn(async move { (page, fut.await) });
        }

        let mut pages = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (page, result) = joined
                .map_err(|e| AppError::Internal(format!("Page fetch task failed: {}", e)))?;
            match result {
                Ok(response) => {
                    pages.insert(page, response.results);
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "Passthrough page failed, cancelling the rest");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        let movies: Vec<TmdbMovie> = pages.into_values().flatten().collect();
        tracing::debug!(pages = self.popular_pages, fetched = movies.len(), "Passthrough pages fetched");
        Ok(movies)
    }

    async fn only_uncached(&self, movies: Vec<TmdbMovie>) -> AppResult<Vec<PopularMovie>> {
        let stored = self.store.tmdb_ids().await?;
        let mut seen = HashSet::new();

        Ok(movies
            .into_iter()
            .filter(|m| !stored.contains(&m.id) && seen.insert(m.id))
            .map(|movie| PopularMovie {
                movie,
                exists_in_db: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryCatalogStore, MemoryGenreStore},
        models::{Genre, MovieDraft},
        services::providers::MockMovieSource,
    };
    use mockall::predicate::eq;
    use serde_json::json;

    fn tmdb(id: i64) -> TmdbMovie {
        TmdbMovie {
            id,
            title: format!("Movie {}", id),
            original_title: String::new(),
            original_language: None,
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            popularity: 1.0,
            vote_average: 0.0,
            vote_count: 0,
            release_date: None,
            genre_ids: vec![],
            adult: false,
        }
    }

    fn stored(id: i64, tmdb_id: i64, ranking: i32, genres: Vec<Genre>) -> Movie {
        Movie::from_draft(
            id,
            MovieDraft {
                tmdb_id,
                title: format!("Movie {}", tmdb_id),
                original_title: String::new(),
                overview: String::new(),
                poster_path: None,
                backdrop_path: None,
                popularity: 1.0,
                vote_average: 0.0,
                vote_count: 0,
                release_date: None,
                genres,
                ranking,
            },
        )
    }

    fn service(source: MockMovieSource, movies: Vec<Movie>, popular_pages: u32) -> CatalogService {
        CatalogService::new(
            Arc::new(source),
            Arc::new(MemoryGenreStore::new(vec![
                Genre::new(28, "액션"),
                Genre::new(35, "코미디"),
            ])),
            Arc::new(MemoryCatalogStore::with_movies(movies)),
            popular_pages,
        )
    }

    #[tokio::test]
    async fn test_movie_by_tmdb_id_not_found() {
        let service = service(MockMovieSource::new(), vec![stored(1, 10, 1, vec![])], 1);

        assert_eq!(service.movie_by_tmdb_id(10).await.unwrap().id, 1);
        assert!(matches!(
            service.movie_by_tmdb_id(11).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_movies_by_genre() {
        let action = Genre::new(28, "액션");
        let service = service(
            MockMovieSource::new(),
            vec![
                stored(1, 10, 2, vec![action.clone()]),
                stored(2, 20, 1, vec![action]),
                stored(3, 30, 3, vec![]),
            ],
            1,
        );

        let movies = service.movies_by_genre("액션").await.unwrap();
        let ids: Vec<i64> = movies.iter().map(|m| m.tmdb_id).collect();
        assert_eq!(ids, vec![20, 10]);

        assert!(matches!(
            service.movies_by_genre("코미디").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_popular_flags_stored_movies() {
        let mut source = MockMovieSource::new();
        source
            .expect_popular()
            .with(eq(1))
            .times(1)
            .returning(|p| Ok(TmdbPage::new(p, 10, vec![tmdb(10), tmdb(11)])));
        let service = service(source, vec![stored(1, 10, 1, vec![])], 3);

        let popular = service.popular().await.unwrap();

        assert_eq!(popular.len(), 2);
        assert!(popular[0].exists_in_db);
        assert!(!popular[1].exists_in_db);

        let json = serde_json::to_value(&popular[1]).unwrap();
        assert_eq!(json["id"], 11);
        assert_eq!(json["exists_in_db"], false);
    }

    #[tokio::test]
    async fn test_popular_uncached_scans_pages() {
        let mut source = MockMovieSource::new();
        source
            .expect_popular()
            .times(2)
            .returning(|p| match p {
                1 => Ok(TmdbPage::new(1, 9, vec![tmdb(10), tmdb(11)])),
                _ => Ok(TmdbPage::new(p, 9, vec![tmdb(11), tmdb(12)])),
            });
        let service = service(source, vec![stored(1, 10, 1, vec![])], 2);

        let popular = service.popular_uncached().await.unwrap();
        let ids: Vec<i64> = popular.iter().map(|p| p.movie.id).collect();

        assert_eq!(ids, vec![11, 12]);
        assert!(popular.iter().all(|p| !p.exists_in_db));
    }

    #[test]
    fn test_popular_pages_clamped() {
        assert_eq!(service(MockMovieSource::new(), vec![], 0).popular_pages, 1);
        assert_eq!(
            service(MockMovieSource::new(), vec![], 10_000).popular_pages,
            DEFAULT_MAX_PAGES
        );
        assert_eq!(service(MockMovieSource::new(), vec![], 5).popular_pages, 5);
    }

    #[tokio::test]
    async fn test_popular_uncached_keeps_page_order() {
        let mut source = MockMovieSource::new();
        source.expect_popular().times(3).returning(|p| {
            Ok(TmdbPage::new(p, 3, vec![tmdb(i64::from(p) * 10)]))
        });
        let service = service(source, vec![], 3);

        let ids: Vec<i64> = service
            .popular_uncached()
            .await
            .unwrap()
            .iter()
            .map(|p| p.movie.id)
            .collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_failed_popular_page_fails_listing() {
        let mut source = MockMovieSource::new();
        source.expect_popular().returning(|p| match p {
            2 => Err(AppError::ExternalApi("TMDB returned status 503".to_string())),
            _ => Ok(TmdbPage::new(p, 4, vec![tmdb(i64::from(p))])),
        });
        let service = service(source, vec![], 4);

        assert!(matches!(
            service.popular_uncached().await,
            Err(AppError::ExternalApi(_))
        ));
    }

    #[tokio::test]
    async fn test_popular_by_genre_resolves_name() {
        let mut source = MockMovieSource::new();
        source
            .expect_discover_by_genre()
            .withf(|genre_id, _| *genre_id == 35)
            .times(1)
            .returning(|_, p| Ok(TmdbPage::new(p, 1, vec![tmdb(40)])));
        let service = service(source, vec![], 1);

        let popular = service.popular_by_genre("코미디").await.unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].movie.id, 40);
    }

    #[tokio::test]
    async fn test_popular_by_unknown_genre() {
        let service = service(MockMovieSource::new(), vec![], 1);

        assert!(matches!(
            service.popular_by_genre("뮤지컬").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let mut source = MockMovieSource::new();
        source
            .expect_credits()
            .returning(|_| Err(AppError::ExternalApi("TMDB returned status 500".to_string())));
        source.expect_detail().returning(|id| Ok(json!({ "id": id })));
        let service = service(source, vec![], 1);

        assert!(matches!(service.credits(1).await, Err(AppError::ExternalApi(_))));
        assert_eq!(service.detail(7).await.unwrap()["id"], 7);
    }
}
