//! Shared application state for the Axum API server.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use weighin_common::config::AppConfig;
use weighin_engine::QueueProcessor;
use weighin_engine::preferences::PreferenceResolver;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
    pub processor: Arc<QueueProcessor>,
    pub preferences: Arc<PreferenceResolver>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        config: AppConfig,
        processor: QueueProcessor,
    ) -> Self {
        Self {
            pool,
            redis,
            config,
            processor: Arc::new(processor),
            preferences: Arc::new(PreferenceResolver::default()),
        }
    }
}
