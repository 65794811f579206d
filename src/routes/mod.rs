use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod movies;
pub mod state;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/movies", movie_routes())
        .nest("/api/movies", user_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// Catalog routes under /movies
fn movie_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fetch", get(movies::fetch))
        .route("/moviesList", get(movies::list))
        .route("/genre/:genre_name", get(movies::by_genre))
        .route("/popular", get(movies::popular))
        .route("/popular/all", get(movies::popular_all))
        .route("/popular/genre/:genre_name", get(movies::popular_by_genre))
        .route("/:tmdb_id", get(movies::by_tmdb_id))
        .route("/:tmdb_id/credits", get(movies::credits))
        .route("/:tmdb_id/detail", get(movies::detail))
}

/// Account routes under /api/movies
fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(users::login))
        .route("/social-login", post(users::social_login))
        .route("/signup", post(users::signup))
        .route("/check-email/:email", get(users::check_email))
        .route("/passwordReset", post(users::password_reset))
        .route("/mypage", get(users::mypage))
        .route(
            "/mypage/user/:user_num",
            get(users::profile).put(users::update_profile),
        )
        .route("/getUserNum", get(users::user_num))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
