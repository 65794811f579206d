use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Genre;

/// A movie mirrored from the now-playing listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Storage identity, preserved across synchronization runs
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<Genre>,
    /// 1-based position in the most recent synchronization run
    pub ranking: i32,
}

/// Every field of a movie except its storage identity
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDraft {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<Genre>,
    pub ranking: i32,
}

impl Movie {
    pub fn from_draft(id: i64, draft: MovieDraft) -> Self {
        Self {
            id,
            tmdb_id: draft.tmdb_id,
            title: draft.title,
            original_title: draft.original_title,
            overview: draft.overview,
            poster_path: draft.poster_path,
            backdrop_path: draft.backdrop_path,
            popularity: draft.popularity,
            vote_average: draft.vote_average,
            vote_count: draft.vote_count,
            release_date: draft.release_date,
            genres: draft.genres,
            ranking: draft.ranking,
        }
    }

    /// Replaces every descriptive field, the genre set and the rank.
    /// `id` and `tmdb_id` are left untouched.
    pub fn overwrite(&mut self, draft: MovieDraft) {
        self.title = draft.title;
        self.original_title = draft.original_title;
        self.overview = draft.overview;
        self.poster_path = draft.poster_path;
        self.backdrop_path = draft.backdrop_path;
        self.popularity = draft.popularity;
        self.vote_average = draft.vote_average;
        self.vote_count = draft.vote_count;
        self.release_date = draft.release_date;
        self.genres = draft.genres;
        self.ranking = draft.ranking;
    }

    pub fn has_genre(&self, genre_name: &str) -> bool {
        self.genres.iter().any(|g| g.genre_name == genre_name)
    }
}
