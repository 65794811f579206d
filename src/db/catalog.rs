//! Movie persistence.
//!
//! The synchronizer never writes row by row: it hands the store a complete
//! [`SyncPlan`] and the store applies it atomically.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::AppResult,
    models::{Genre, Movie, MovieDraft},
};

/// Write set produced by one synchronization run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    /// Existing rows to overwrite, keyed by storage id
    pub updates: Vec<(i64, MovieDraft)>,
    pub inserts: Vec<MovieDraft>,
    /// TMDB ids no longer present in the listing
    pub deletes: Vec<i64>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Persisted catalog of now-playing movies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All movies ordered by rank
    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>>;

    /// Movies carrying a genre with exactly this name, ordered by rank
    async fn find_by_genre_name(&self, genre_name: &str) -> AppResult<Vec<Movie>>;

    async fn tmdb_ids(&self) -> AppResult<HashSet<i64>>;

    /// Applies every update, insert and delete of the plan, or none of them
    async fn apply_sync(&self, plan: &SyncPlan) -> AppResult<()>;
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: i64,
    tmdb_id: i64,
    title: String,
    original_title: String,
    overview: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    popularity: f64,
    vote_average: f64,
    vote_count: i64,
    release_date: Option<NaiveDate>,
    ranking: i32,
}

#[derive(sqlx::FromRow)]
struct MovieGenreRow {
    movie_id: i64,
    genre_id: i32,
    genre_name: String,
}

const MOVIE_COLUMNS: &str = "m.id, m.tmdb_id, m.title, m.original_title, m.overview, \
     m.poster_path, m.backdrop_path, m.popularity, m.vote_average, m.vote_count, \
     m.release_date, m.ranking";

/// PostgreSQL-backed catalog store
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches ordered genre lists to a batch of movie rows
    async fn hydrate(&self, rows: Vec<MovieRow>) -> AppResult<Vec<Movie>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let genre_rows = sqlx::query_as::<_, MovieGenreRow>(
            r#"
            SELECT mg.movie_id, g.genre_id, g.genre_name
            FROM movie_genres mg
            JOIN genres g ON g.genre_id = mg.genre_id
            WHERE mg.movie_id = ANY($1)
            ORDER BY mg.movie_id, mg.position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
        for row in genre_rows {
            genres
                .entry(row.movie_id)
                .or_default()
                .push(Genre::new(row.genre_id, row.genre_name));
        }

        Ok(rows
            .into_iter()
            .map(|row| Movie {
                genres: genres.remove(&row.id).unwrap_or_default(),
                id: row.id,
                tmdb_id: row.tmdb_id,
                title: row.title,
                original_title: row.original_title,
                overview: row.overview,
                poster_path: row.poster_path,
                backdrop_path: row.backdrop_path,
                popularity: row.popularity,
                vote_average: row.vote_average,
                vote_count: row.vote_count,
                release_date: row.release_date,
                ranking: row.ranking,
            })
            .collect())
    }

    async fn replace_genres(
        tx: &mut Transaction<'_, Postgres>,
        movie_id: i64,
        genres: &[Genre],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
            .bind(movie_id)
            .execute(&mut **tx)
            .await?;

        for (position, genre) in genres.iter().enumerate() {
            sqlx::query(
                "INSERT INTO movie_genres (movie_id, genre_id, position) VALUES ($1, $2, $3)",
            )
            .bind(movie_id)
            .bind(genre.genre_id)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies m ORDER BY m.ranking, m.id",
            MOVIE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies m WHERE m.tmdb_id = $1",
            MOVIE_COLUMNS
        ))
        .bind(tmdb_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn find_by_genre_name(&self, genre_name: &str) -> AppResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            r#"
            SELECT {} FROM movies m
            WHERE EXISTS (
                SELECT 1 FROM movie_genres mg
                JOIN genres g ON g.genre_id = mg.genre_id
                WHERE mg.movie_id = m.id AND g.genre_name = $1
            )
            ORDER BY m.ranking, m.id
            "#,
            MOVIE_COLUMNS
        ))
        .bind(genre_name)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn tmdb_ids(&self) -> AppResult<HashSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT tmdb_id FROM movies")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn apply_sync(&self, plan: &SyncPlan) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for (id, draft) in &plan.updates {
            sqlx::query(
                r#"
                UPDATE movies
                SET title = $2, original_title = $3, overview = $4, poster_path = $5,
                    backdrop_path = $6, popularity = $7, vote_average = $8, vote_count = $9,
                    release_date = $10, ranking = $11
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&draft.title)
            .bind(&draft.original_title)
            .bind(&draft.overview)
            .bind(&draft.poster_path)
            .bind(&draft.backdrop_path)
            .bind(draft.popularity)
            .bind(draft.vote_average)
            .bind(draft.vote_count)
            .bind(draft.release_date)
            .bind(draft.ranking)
            .execute(&mut *tx)
            .await?;

            Self::replace_genres(&mut tx, *id, &draft.genres).await?;
        }

        for draft in &plan.inserts {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO movies (tmdb_id, title, original_title, overview, poster_path,
                    backdrop_path, popularity, vote_average, vote_count, release_date, ranking)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id
                "#,
            )
            .bind(draft.tmdb_id)
            .bind(&draft.title)
            .bind(&draft.original_title)
            .bind(&draft.overview)
            .bind(&draft.poster_path)
            .bind(&draft.backdrop_path)
            .bind(draft.popularity)
            .bind(draft.vote_average)
            .bind(draft.vote_count)
            .bind(draft.release_date)
            .bind(draft.ranking)
            .fetch_one(&mut *tx)
            .await?;

            Self::replace_genres(&mut tx, id, &draft.genres).await?;
        }

        if !plan.deletes.is_empty() {
            // movie_genres rows go with ON DELETE CASCADE
            sqlx::query("DELETE FROM movies WHERE tmdb_id = ANY($1)")
                .bind(&plan.deletes)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            updated = plan.updates.len(),
            inserted = plan.inserts.len(),
            deleted = plan.deletes.len(),
            "Sync plan committed"
        );

        Ok(())
    }
}
