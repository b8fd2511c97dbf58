//! Redis-backed run lock for the notification queue.
//!
//! The queue processor is not safe to run twice at once: two overlapping runs
//! can both fetch a notification before either persists its dispatch timestamp.
//! Callers take this lock around every invocation so at most one run is active
//! across all processes sharing the Redis instance.
//!
//! Acquisition is `SET key token NX EX ttl`; the TTL bounds how long a crashed
//! holder can block later runs. The lock is not renewed, so the TTL must
//! outlive a full run (see `AppConfig::min_lock_ttl_secs`). Release only
//! deletes the key if it still holds our token.

use redis::Client;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::AppError;

/// Redis key prefix for run locks.
const LOCK_PREFIX: &str = "weighin:lock:";

/// Compare-and-delete so an expired holder never frees a newer holder's lock.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Create a Redis connection manager for async operations.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}

/// A named, expiring mutual-exclusion lock.
#[derive(Debug, Clone)]
pub struct RunLock {
    key: String,
    token: String,
    ttl_secs: u64,
}

impl RunLock {
    pub fn new(name: &str, ttl_secs: u64) -> Self {
        Self {
            key: Self::key_for(name),
            token: Uuid::new_v4().to_string(),
            ttl_secs: ttl_secs.max(1),
        }
    }

    /// Lock guarding the notification queue processor.
    pub fn notification_queue(ttl_secs: u64) -> Self {
        Self::new("notification-queue", ttl_secs)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn key_for(name: &str) -> String {
        format!("{}{}", LOCK_PREFIX, name)
    }

    /// Try to take the lock.
    ///
    /// Returns `true` if this instance now holds the lock, `false` if another
    /// holder has it.
    pub async fn try_acquire(&self, redis: &mut ConnectionManager) -> Result<bool, AppError> {
        // Some("OK") when set, None when the key already exists
        let result: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.token)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(redis)
            .await?;

        let acquired = result.is_some();
        if !acquired {
            tracing::debug!(key = %self.key, "Run lock held by another process");
        }

        Ok(acquired)
    }

    /// Release the lock if we still hold it.
    pub async fn release(&self, redis: &mut ConnectionManager) -> Result<(), AppError> {
        let removed: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(redis)
            .await?;

        if removed == 0 {
            tracing::warn!(key = %self.key, "Run lock expired before release");
        }

        Ok(())
    }
}
