use serde::Deserialize;

/// Largest batch a single queue run may fetch.
pub const MAX_QUEUE_BATCH_SIZE: i64 = 100;

/// Lock TTL used when `QUEUE_LOCK_TTL_SECS` is unset, unless a full batch needs longer.
const DEFAULT_LOCK_TTL_SECS: u64 = 3600;

/// Slack added on top of the worst-case batch duration.
const LOCK_TTL_MARGIN_SECS: u64 = 60;

/// Which push provider the queue processor delivers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushProviderKind {
    OneSignal,
    Novu,
}

impl std::str::FromStr for PushProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onesignal" => Ok(PushProviderKind::OneSignal),
            "novu" => Ok(PushProviderKind::Novu),
            other => Err(format!(
                "unknown push provider '{}', expected 'onesignal' or 'novu'",
                other
            )),
        }
    }
}

impl std::fmt::Display for PushProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushProviderKind::OneSignal => write!(f, "onesignal"),
            PushProviderKind::Novu => write!(f, "novu"),
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (run lock)
    pub redis_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Push provider used for delivery
    pub push_provider: PushProviderKind,

    pub onesignal_app_id: Option<String>,
    pub onesignal_rest_api_key: Option<String>,
    pub onesignal_api_url: String,

    pub novu_api_key: Option<String>,
    /// Novu workflow triggered for every notification
    pub novu_workflow_id: String,
    pub novu_api_url: String,

    /// Per-request timeout for provider calls in seconds (default: 30)
    pub push_timeout_secs: u64,

    /// Default batch size when the caller does not pass one (default: 50)
    pub queue_batch_size: i64,

    /// Pause between consecutive provider calls in milliseconds (default: 100)
    pub queue_send_delay_ms: u64,

    /// TTL of the queue run lock in seconds (default: 3600, never below
    /// [`AppConfig::min_lock_ttl_secs`])
    pub queue_lock_ttl_secs: u64,

    /// Scheduler cadence in seconds (default: 86400, daily)
    pub scheduler_interval_secs: u64,

    /// Shared secret for the queue trigger and enqueue endpoints
    pub cron_secret: Option<String>,

    /// HS256 secret used to verify Supabase-issued user JWTs
    pub supabase_jwt_secret: Option<String>,

    /// HTTP listen port (default: 3000)
    pub api_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let lock_ttl: Option<u64> = std::env::var("QUEUE_LOCK_TTL_SECS")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| anyhow::anyhow!("QUEUE_LOCK_TTL_SECS must be a valid u64"))?;

        let mut config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            push_provider: std::env::var("PUSH_PROVIDER")
                .unwrap_or_else(|_| "onesignal".to_string())
                .parse()
                .map_err(|e: String| anyhow::anyhow!("PUSH_PROVIDER: {}", e))?,
            onesignal_app_id: non_empty_var("ONESIGNAL_APP_ID"),
            onesignal_rest_api_key: non_empty_var("ONESIGNAL_REST_API_KEY"),
            onesignal_api_url: std::env::var("ONESIGNAL_API_URL")
                .unwrap_or_else(|_| "https://onesignal.com".to_string()),
            novu_api_key: non_empty_var("NOVU_API_KEY"),
            novu_workflow_id: std::env::var("NOVU_WORKFLOW_ID")
                .unwrap_or_else(|_| "weighin-notification".to_string()),
            novu_api_url: std::env::var("NOVU_API_URL")
                .unwrap_or_else(|_| "https://api.novu.co".to_string()),
            push_timeout_secs: std::env::var("PUSH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_TIMEOUT_SECS must be a valid u64"))?,
            queue_batch_size: std::env::var("QUEUE_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_BATCH_SIZE must be a valid integer"))?,
            queue_send_delay_ms: std::env::var("QUEUE_SEND_DELAY_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_SEND_DELAY_MS must be a valid u64"))?,
            queue_lock_ttl_secs: lock_ttl.unwrap_or(DEFAULT_LOCK_TTL_SECS),
            scheduler_interval_secs: std::env::var("SCHEDULER_INTERVAL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCHEDULER_INTERVAL_SECS must be a valid u64"))?,
            cron_secret: non_empty_var("CRON_SECRET"),
            supabase_jwt_secret: non_empty_var("SUPABASE_JWT_SECRET"),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
        };

        if lock_ttl.is_none() {
            config.queue_lock_ttl_secs = config.queue_lock_ttl_secs.max(config.min_lock_ttl_secs());
        }
        config.validate()?;

        Ok(config)
    }

    /// Shortest run lock TTL that outlives a full batch in which every
    /// provider call times out. The lock is never renewed during a run.
    pub fn min_lock_ttl_secs(&self) -> u64 {
        let per_send_ms = self
            .push_timeout_secs
            .saturating_mul(1000)
            .saturating_add(self.queue_send_delay_ms);
        let batch_ms = per_send_ms.saturating_mul(MAX_QUEUE_BATCH_SIZE as u64);

        batch_ms.div_ceil(1000).saturating_add(LOCK_TTL_MARGIN_SECS)
    }

    /// Reject settings under which two queue runs could overlap.
    pub fn validate(&self) -> anyhow::Result<()> {
        let min = self.min_lock_ttl_secs();
        if self.queue_lock_ttl_secs < min {
            anyhow::bail!(
                "QUEUE_LOCK_TTL_SECS is {} but a full batch of {} sends can take up to {}s; \
                 raise it or lower PUSH_TIMEOUT_SECS / QUEUE_SEND_DELAY_MS",
                self.queue_lock_ttl_secs,
                MAX_QUEUE_BATCH_SIZE,
                min
            );
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
