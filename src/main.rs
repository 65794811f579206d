use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movieus_api::{
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, Cache, PgCatalogStore, PgGenreStore,
        PgUserStore,
    },
    routes::{create_router, AppState},
    services::{
        providers::TmdbProvider, CatalogService, CatalogSynchronizer, JwtTokenProvider, LogMailer,
        Mailer, SmtpMailer, UserService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movieus_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    run_migrations(&pool).await?;

    let (cache, cache_handle) = match config.redis_url.as_deref() {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?);
            tracing::info!("Response caching enabled");
            (Some(cache), Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, response caching disabled");
            (None, None)
        }
    };

    let source = Arc::new(TmdbProvider::from_config(&config, cache)?);
    let genres = Arc::new(PgGenreStore::new(pool.clone()));
    let catalog_store = Arc::new(PgCatalogStore::new(pool.clone()));

    let synchronizer = Arc::new(
        CatalogSynchronizer::new(source.clone(), genres.clone(), catalog_store.clone())
            .with_max_pages(config.tmdb_max_pages),
    );
    let catalog = Arc::new(CatalogService::new(
        source,
        genres,
        catalog_store,
        config.popular_pages,
    ));

    let mailer: Arc<dyn Mailer> = match SmtpMailer::from_config(&config)? {
        Some(mailer) => Arc::new(mailer),
        None => {
            tracing::warn!("SMTP_HOST not set, password reset links will only be logged");
            Arc::new(LogMailer)
        }
    };
    let users = Arc::new(UserService::new(
        Arc::new(PgUserStore::new(pool)),
        JwtTokenProvider::new(&config.jwt_secret, config.jwt_ttl_secs),
        mailer,
        config.password_reset_url.clone(),
    ));

    if config.sync_on_startup {
        let synchronizer = synchronizer.clone();
        tokio::spawn(async move {
            if let Err(e) = synchronizer.synchronize().await {
                tracing::error!(error = %e, "Startup synchronization failed");
            }
        });
    }

    let state = AppState::new(synchronizer, catalog, users);

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .context("CORS_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
