//! In-process stores for tests and local runs without PostgreSQL.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CatalogStore, GenreLookup, SyncPlan, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{Genre, Movie, NewUser, User},
};

#[derive(Default)]
struct CatalogInner {
    /// Keyed by TMDB id
    movies: BTreeMap<i64, Movie>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    inner: RwLock<CatalogInner>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with pre-existing rows, keeping their storage ids
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        let next_id = movies.iter().map(|m| m.id).max().unwrap_or(0);
        let movies = movies.into_iter().map(|m| (m.tmdb_id, m)).collect();
        Self {
            inner: RwLock::new(CatalogInner { movies, next_id }),
        }
    }

    fn ranked(mut movies: Vec<Movie>) -> Vec<Movie> {
        movies.sort_by_key(|m| (m.ranking, m.id));
        movies
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(Self::ranked(inner.movies.values().cloned().collect()))
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.get(&tmdb_id).cloned())
    }

    async fn find_by_genre_name(&self, genre_name: &str) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(Self::ranked(
            inner
                .movies
                .values()
                .filter(|m| m.has_genre(genre_name))
                .cloned()
                .collect(),
        ))
    }

    async fn tmdb_ids(&self) -> AppResult<HashSet<i64>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.keys().copied().collect())
    }

    async fn apply_sync(&self, plan: &SyncPlan) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        // Validate first so a bad plan leaves the map untouched
        for (id, draft) in &plan.updates {
            match inner.movies.get(&draft.tmdb_id) {
                Some(existing) if existing.id == *id => {}
                _ => {
                    return Err(AppError::Internal(format!(
                        "Update targets unknown row {} (tmdb {})",
                        id, draft.tmdb_id
                    )))
                }
            }
        }

        for (_, draft) in &plan.updates {
            if let Some(existing) = inner.movies.get_mut(&draft.tmdb_id) {
                existing.overwrite(draft.clone());
            }
        }

        for draft in &plan.inserts {
            inner.next_id += 1;
            let movie = Movie::from_draft(inner.next_id, draft.clone());
            inner.movies.insert(movie.tmdb_id, movie);
        }

        for tmdb_id in &plan.deletes {
            inner.movies.remove(tmdb_id);
        }

        Ok(())
    }
}

pub struct MemoryGenreStore {
    genres: Vec<Genre>,
}

impl MemoryGenreStore {
    pub fn new(genres: Vec<Genre>) -> Self {
        Self { genres }
    }
}

#[async_trait]
impl GenreLookup for MemoryGenreStore {
    async fn all_genres(&self) -> AppResult<Vec<Genre>> {
        Ok(self.genres.clone())
    }

    async fn find_by_name(&self, genre_name: &str) -> AppResult<Option<Genre>> {
        Ok(self
            .genres
            .iter()
            .find(|g| g.genre_name == genre_name)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_email == email).cloned())
    }

    async fn find_by_num(&self, user_num: i32) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_num == user_num).cloned())
    }

    async fn find_by_name(&self, user_name: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_name == user_name).cloned())
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.user_email == user.user_email) {
            return Err(AppError::Duplicate(format!(
                "Email {} is already registered",
                user.user_email
            )));
        }

        let stored = User {
            user_num: users.len() as i32 + 1,
            user_email: user.user_email,
            user_name: user.user_name,
            user_pw: user.user_pw,
            user_phone: user.user_phone,
            social_login: user.social_login,
            created_at: Utc::now(),
        };
        users.push(stored.clone());
        Ok(stored)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.user_email == email) {
            Some(user) => {
                user.user_pw = Some(password_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        user_num: i32,
        user_name: &str,
        user_phone: Option<String>,
    ) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users
            .iter_mut()
            .find(|u| u.user_num == user_num)
            .map(|user| {
                user.user_name = user_name.to_string();
                user.user_phone = user_phone;
                user.clone()
            }))
    }
}
