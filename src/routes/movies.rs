use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Movie, PopularMovie},
    routes::AppState,
};

/// Runs a catalog synchronization, joining one already in flight
pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<&'static str> {
    tracing::info!(request_id = %request_id, "Synchronization requested");

    let report = state.synchronizer.synchronize().await?;

    tracing::info!(
        request_id = %request_id,
        joined = report.joined,
        fetched = report.fetched,
        "Synchronization request served"
    );

    Ok("Movies fetched and saved!")
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.list_movies().await?))
}

pub async fn by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre_name): Path<String>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.movies_by_genre(&genre_name).await?))
}

pub async fn by_tmdb_id(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i64>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.catalog.movie_by_tmdb_id(tmdb_id).await?))
}

pub async fn credits(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.catalog.credits(tmdb_id).await?))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.catalog.detail(tmdb_id).await?))
}

pub async fn popular(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<PopularMovie>>> {
    Ok(Json(state.catalog.popular().await?))
}

pub async fn popular_all(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<PopularMovie>>> {
    Ok(Json(state.catalog.popular_uncached().await?))
}

pub async fn popular_by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre_name): Path<String>,
) -> AppResult<Json<Vec<PopularMovie>>> {
    Ok(Json(state.catalog.popular_by_genre(&genre_name).await?))
}
