//! Fixed-cadence runner for the notification queue processor.
//!
//! Each tick takes the queue run lock, runs one processor pass and releases
//! the lock. A tick that finds the lock held is skipped; a failed run is
//! logged and the next tick tries again.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::time::MissedTickBehavior;

use weighin_common::error::AppError;
use weighin_common::lock::RunLock;
use weighin_engine::{ProcessOptions, ProcessSummary, QueueProcessor};

/// Mutual exclusion around a processor run.
#[async_trait]
pub trait RunGuard: Send {
    async fn try_acquire(&mut self) -> Result<bool, AppError>;
    async fn release(&mut self) -> Result<(), AppError>;
}

/// [`RunGuard`] backed by the shared Redis [`RunLock`].
pub struct RedisRunGuard {
    lock: RunLock,
    redis: ConnectionManager,
}

impl RedisRunGuard {
    pub fn new(lock: RunLock, redis: ConnectionManager) -> Self {
        Self { lock, redis }
    }
}

#[async_trait]
impl RunGuard for RedisRunGuard {
    async fn try_acquire(&mut self) -> Result<bool, AppError> {
        self.lock.try_acquire(&mut self.redis).await
    }

    async fn release(&mut self) -> Result<(), AppError> {
        self.lock.release(&mut self.redis).await
    }
}

pub struct QueueScheduler<G> {
    processor: QueueProcessor,
    guard: G,
    interval: Duration,
}

impl<G: RunGuard> QueueScheduler<G> {
    pub fn new(processor: QueueProcessor, guard: G, interval: Duration) -> Self {
        Self {
            processor,
            guard,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// One guarded pass. `Ok(None)` means another run held the lock.
    pub async fn run_once(&mut self) -> Result<Option<ProcessSummary>, AppError> {
        if !self.guard.try_acquire().await? {
            tracing::info!("Notification queue run skipped: lock held elsewhere");
            return Ok(None);
        }

        let result = self.processor.process(ProcessOptions::default()).await;

        if let Err(e) = self.guard.release().await {
            tracing::warn!(error = %e, "Failed to release notification queue lock");
        }

        result.map(Some)
    }

    /// Tick forever. The first run happens immediately.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            provider = self.processor.provider_name(),
            "Notification queue scheduler started"
        );

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(Some(summary)) if summary.failed > 0 => {
                    tracing::warn!(
                        failed = summary.failed,
                        sent = summary.sent,
                        "Notification queue run finished with failures"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Notification queue run failed");
                }
            }
        }
    }
}
