//! Mirrors the remote now-playing listing into the catalog store.
//!
//! A run fetches every page first, then diffs the complete listing against
//! the stored rows and hands the store one [`SyncPlan`]. Nothing is written
//! unless the whole listing was fetched, so a failed page can never delete
//! movies that are still playing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::{CatalogStore, GenreLookup, SyncPlan},
    error::AppResult,
    models::{Genre, Movie, MovieDraft, TmdbMovie},
    services::providers::MovieSource,
};

/// TMDB refuses page numbers above 500
pub const DEFAULT_MAX_PAGES: u32 = 500;

/// Outcome of one synchronization run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncReport {
    pub pages: u32,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub duplicates_skipped: usize,
    pub unresolved_genres: usize,
    /// True when this caller waited on a run started by someone else
    pub joined: bool,
    pub completed_at: DateTime<Utc>,
}

/// Full remote listing in source order
#[derive(Debug, Default)]
struct Listing {
    movies: Vec<TmdbMovie>,
    pages: u32,
}

/// Deduplicated, ranked drafts ready to diff
#[derive(Debug, Default, PartialEq)]
pub struct RankedListing {
    pub drafts: Vec<MovieDraft>,
    pub duplicates_skipped: usize,
    pub unresolved_genres: usize,
}

pub struct CatalogSynchronizer {
    source: Arc<dyn MovieSource>,
    genres: Arc<dyn GenreLookup>,
    store: Arc<dyn CatalogStore>,
    max_pages: u32,
    /// Held for the whole run; stores the last successful report
    in_flight: Mutex<Option<SyncReport>>,
    completed_runs: AtomicU64,
}

impl CatalogSynchronizer {
    pub fn new(
        source: Arc<dyn MovieSource>,
        genres: Arc<dyn GenreLookup>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            source,
            genres,
            store,
            max_pages: DEFAULT_MAX_PAGES,
            in_flight: Mutex::new(None),
            completed_runs: AtomicU64::new(0),
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Brings the store in line with the current now-playing listing.
    ///
    /// Runs are single-flight: a caller that arrives while a run is in
    /// progress waits for it and receives its report instead of starting
    /// another one. If that run failed, the waiter performs its own run.
    pub async fn synchronize(&self) -> AppResult<SyncReport> {
        let seen = self.completed_runs.load(Ordering::Acquire);
        let mut last = self.in_flight.lock().await;

        if self.completed_runs.load(Ordering::Acquire) != seen {
            if let Some(report) = last.as_ref() {
                tracing::info!("Synchronization already completed while waiting, reusing report");
                return Ok(SyncReport {
                    joined: true,
                    ..report.clone()
                });
            }
        }

        let report = self.run().await?;
        *last = Some(report.clone());
        self.completed_runs.fetch_add(1, Ordering::Release);
        Ok(report)
    }

    async fn run(&self) -> AppResult<SyncReport> {
        let start = Instant::now();
        tracing::info!(provider = self.source.name(), "Starting catalog synchronization");

        let listing = self.fetch_listing().await?;

        let genres: HashMap<i32, Genre> = self
            .genres
            .all_genres()
            .await?
            .into_iter()
            .map(|g| (g.genre_id, g))
            .collect();

        let ranked = rank_listing(listing.movies, &genres);
        let fetched = ranked.drafts.len();

        let existing = self.store.list_movies().await?;
        let plan = plan_sync(&existing, ranked.drafts);

        let report = SyncReport {
            pages: listing.pages,
            fetched,
            inserted: plan.inserts.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
            duplicates_skipped: ranked.duplicates_skipped,
            unresolved_genres: ranked.unresolved_genres,
            joined: false,
            completed_at: Utc::now(),
        };

        if plan.is_empty() {
            tracing::debug!("Listing and store are both empty, nothing to apply");
        } else {
            self.store.apply_sync(&plan).await?;
        }

        tracing::info!(
            pages = report.pages,
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog synchronization completed"
        );

        Ok(report)
    }

    /// Walks pages from 1 through the declared page count, capped by
    /// `max_pages`. An empty page inside that range does not end the walk.
    /// Any page error aborts the whole fetch.
    async fn fetch_listing(&self) -> AppResult<Listing> {
        let mut listing = Listing::default();
        let mut page = 1;

        loop {
            let response = self.source.now_playing(page).await.map_err(|e| {
                tracing::error!(page, error = %e, "Now-playing fetch failed, aborting run");
                e
            })?;

            if response.results.is_empty() {
                tracing::debug!(page, total_pages = response.total_pages, "Empty now-playing page");
            }

            listing.pages = page;
            listing.movies.extend(response.results);

            let last_page = response.total_pages.min(self.max_pages);
            if page >= last_page {
                break;
            }
            page += 1;
        }

        Ok(listing)
    }
}

/// Turns a wire record into a draft, keeping only genres known locally
pub fn to_draft(
    movie: TmdbMovie,
    genres: &HashMap<i32, Genre>,
    ranking: i32,
) -> (MovieDraft, usize) {
    let mut resolved = Vec::with_capacity(movie.genre_ids.len());
    let mut unresolved = 0;

    for genre_id in &movie.genre_ids {
        match genres.get(genre_id) {
            Some(genre) if resolved.contains(genre) => {}
            Some(genre) => resolved.push(genre.clone()),
            None => {
                unresolved += 1;
                tracing::warn!(
                    tmdb_id = movie.id,
                    genre_id,
                    "Unknown genre id, storing movie without it"
                );
            }
        }
    }

    let release_date = movie.parsed_release_date();
    let draft = MovieDraft {
        tmdb_id: movie.id,
        title: movie.title,
        original_title: movie.original_title,
        overview: movie.overview,
        poster_path: movie.poster_path,
        backdrop_path: movie.backdrop_path,
        popularity: movie.popularity,
        vote_average: movie.vote_average,
        vote_count: movie.vote_count,
        release_date,
        genres: resolved,
        ranking,
    };

    (draft, unresolved)
}

/// Assigns rank 1, 2, 3, … in source order. A TMDB id seen again on a later
/// page keeps its first position.
pub fn rank_listing(movies: Vec<TmdbMovie>, genres: &HashMap<i32, Genre>) -> RankedListing {
    let mut ranked = RankedListing::default();
    let mut seen = HashSet::with_capacity(movies.len());

    for movie in movies {
        if !seen.insert(movie.id) {
            tracing::debug!(tmdb_id = movie.id, "Duplicate id in listing, skipped");
            ranked.duplicates_skipped += 1;
            continue;
        }

        let ranking = ranked.drafts.len() as i32 + 1;
        let (draft, unresolved) = to_draft(movie, genres, ranking);
        ranked.unresolved_genres += unresolved;
        ranked.drafts.push(draft);
    }

    ranked
}

/// Diffs a complete ranked listing against the stored rows
pub fn plan_sync(existing: &[Movie], drafts: Vec<MovieDraft>) -> SyncPlan {
    let index: HashMap<i64, i64> = existing.iter().map(|m| (m.tmdb_id, m.id)).collect();
    let mut plan = SyncPlan::default();
    let mut current = HashSet::with_capacity(drafts.len());

    for draft in drafts {
        current.insert(draft.tmdb_id);
        match index.get(&draft.tmdb_id) {
            Some(&id) => plan.updates.push((id, draft)),
            None => plan.inserts.push(draft),
        }
    }

    plan.deletes = existing
        .iter()
        .map(|m| m.tmdb_id)
        .filter(|tmdb_id| !current.contains(tmdb_id))
        .collect();
    plan.deletes.sort_unstable();

    plan
}
