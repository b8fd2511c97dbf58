use std::time::Duration;

use weighin_common::config::AppConfig;
use weighin_common::db;
use weighin_common::lock::{RunLock, create_redis_pool};
use weighin_engine::QueueProcessor;
use weighin_scheduler::{QueueScheduler, RedisRunGuard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weighin_scheduler=info,weighin_engine=info".into()),
        )
        .json()
        .init();

    tracing::info!("Weighin notification scheduler starting...");

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let redis = create_redis_pool(&config.redis_url).await?;

    // Missing provider credentials are fatal before any run
    let processor = QueueProcessor::from_config(&config, pool)?;
    let guard = RedisRunGuard::new(RunLock::notification_queue(config.queue_lock_ttl_secs), redis);

    let mut scheduler = QueueScheduler::new(
        processor,
        guard,
        Duration::from_secs(config.scheduler_interval_secs),
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Weighin notification scheduler stopped.");
    Ok(())
}
