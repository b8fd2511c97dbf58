//! Weighin notifications API server binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use weighin_common::config::AppConfig;
use weighin_common::db::{create_pool, run_migrations};
use weighin_common::lock::create_redis_pool;
use weighin_engine::QueueProcessor;

use weighin_api::routes::create_router;
use weighin_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("weighin_api=debug,weighin_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Weighin notifications API...");

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;

    let redis = create_redis_pool(&config.redis_url).await?;

    // Missing provider credentials stop startup here
    let processor = QueueProcessor::from_config(&config, pool.clone())?;
    tracing::info!(provider = processor.provider_name(), "Push provider configured");

    let port = config.api_port;
    let state = AppState::new(pool, redis, config, processor);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    Ok(())
}
