//! # TaskHub API Server
//!
//! REST backend for users, tasks, projects and a dashboard aggregate.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskhub \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p taskhub-api
//! ```
//!
//! `DATABASE_URL=memory://` runs against the in-memory store.

use std::net::SocketAddr;
use taskhub_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
    middleware::rate_limit::RateLimiter,
};
use taskhub_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::Store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskhub_api=debug,taskhub_shared=info,tower_http=debug".into());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    if config.database.is_memory() {
        tracing::warn!("Using in-memory store, data will be lost on shutdown");
        return Ok(Store::memory());
    }

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;
    run_migrations(&pool).await?;

    Ok(Store::postgres(pool))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.logging.format);

    tracing::info!(
        "TaskHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = open_store(&config).await?;
    let rate_limiter = RateLimiter::from_settings(&config.rate_limit).await?;
    tracing::info!(
        store = store.backend_name(),
        rate_limit = rate_limiter.backend_name(),
        "Backends ready"
    );

    let bind_address = config.bind_address();
    let state = AppState::new(store.clone(), config, rate_limiter);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(pool) = store.pool() {
        close_pool(pool.clone()).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
