use async_trait::async_trait;
use sqlx::PgPool;

use crate::{error::AppResult, models::Genre};

/// Read-only access to genre reference data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenreLookup: Send + Sync {
    async fn all_genres(&self) -> AppResult<Vec<Genre>>;

    async fn find_by_name(&self, genre_name: &str) -> AppResult<Option<Genre>>;
}

#[derive(Clone)]
pub struct PgGenreStore {
    pool: PgPool,
}

impl PgGenreStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreLookup for PgGenreStore {
    async fn all_genres(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT genre_id, genre_name FROM genres ORDER BY genre_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn find_by_name(&self, genre_name: &str) -> AppResult<Option<Genre>> {
        let genre = sqlx::query_as::<_, Genre>(
            "SELECT genre_id, genre_name FROM genres WHERE genre_name = $1",
        )
        .bind(genre_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(genre)
    }
}
