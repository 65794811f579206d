/// Remote movie catalog abstraction
///
/// The synchronizer and the passthrough endpoints only ever talk to TMDB
/// through this trait, which keeps them testable against scripted sources.
use crate::{
    error::AppResult,
    models::{TmdbMovie, TmdbPage},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for remote movie listings
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieSource: Send + Sync {
    /// One page of the now-playing listing, in the configured region and sort order
    async fn now_playing(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>>;

    /// One page of the popular listing
    async fn popular(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>>;

    /// One page of movies tagged with a genre
    async fn discover_by_genre(&self, genre_id: i32, page: u32)
        -> AppResult<TmdbPage<TmdbMovie>>;

    /// Raw credits payload, passed through untouched
    async fn credits(&self, tmdb_id: i64) -> AppResult<serde_json::Value>;

    /// Raw detail payload, passed through untouched
    async fn detail(&self, tmdb_id: i64) -> AppResult<serde_json::Value>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
