//! Notification queue processor.
//!
//! A single pass over the queue:
//! 1. Fetch up to `batch_size` queued notifications, oldest first
//! 2. Group them by recipient (first-seen order)
//! 3. Resolve each recipient's preferences (creating defaults if needed)
//! 4. Apply the delivery policy; mark skipped rows dispatched
//! 5. Push the survivors one at a time, pausing between provider calls,
//!    and persist `sent_at` right after each accepted send
//!
//! Everything runs sequentially. Only configuration and fetch errors abort a
//! run; every other failure is recorded in the summary and the batch goes on.
//!
//! Delivery is at-least-once: if a send succeeds but writing `sent_at` fails,
//! the notification is pushed again on the next run. Overlapping runs must be
//! prevented by the caller (see `weighin_common::lock::RunLock`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use weighin_common::config::{AppConfig, MAX_QUEUE_BATCH_SIZE};
use weighin_common::error::AppError;
use weighin_common::types::{Notification, PreferenceDefaults};
use weighin_notifier::{PushMessage, PushProvider, build_provider};

use crate::outcome::{DispatchOutcome, ProcessSummary};
use crate::policy::{self, SkipReason};
use crate::preferences::PreferenceResolver;
use crate::store::{NotificationStore, PgNotificationStore};

/// Default pause between consecutive provider calls.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(100);

/// Batch size clamped to `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(i64);

impl BatchSize {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = MAX_QUEUE_BATCH_SIZE;
    pub const DEFAULT: i64 = 50;

    pub fn new(requested: Option<i64>) -> Self {
        Self(requested.unwrap_or(Self::DEFAULT).clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Caller-supplied options for one run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    #[serde(default)]
    pub batch_size: Option<i64>,
}

/// Enforces the fixed gap between provider calls.
struct Pacer {
    delay: Duration,
    called: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            called: false,
        }
    }

    async fn wait_turn(&mut self) {
        if self.called && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.called = true;
    }
}

pub struct QueueProcessor {
    store: Arc<dyn NotificationStore>,
    provider: Arc<dyn PushProvider>,
    resolver: PreferenceResolver,
    send_delay: Duration,
    default_batch_size: Option<i64>,
}

impl QueueProcessor {
    pub fn new(store: Arc<dyn NotificationStore>, provider: Arc<dyn PushProvider>) -> Self {
        Self {
            store,
            provider,
            resolver: PreferenceResolver::default(),
            send_delay: DEFAULT_SEND_DELAY,
            default_batch_size: None,
        }
    }

    /// Build a Postgres-backed processor using the configured provider.
    ///
    /// Fails with [`AppError::Config`] when provider credentials are missing.
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self, AppError> {
        let provider: Arc<dyn PushProvider> = Arc::from(build_provider(config)?);
        let store = Arc::new(PgNotificationStore::new(pool));

        Ok(Self::new(store, provider)
            .with_send_delay(Duration::from_millis(config.queue_send_delay_ms))
            .with_default_batch_size(config.queue_batch_size))
    }

    pub fn with_defaults(mut self, defaults: PreferenceDefaults) -> Self {
        self.resolver = PreferenceResolver::new(defaults);
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Batch size used when the caller does not pass one.
    pub fn with_default_batch_size(mut self, size: i64) -> Self {
        self.default_batch_size = Some(size);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run one pass over the queue.
    pub async fn process(&self, options: ProcessOptions) -> Result<ProcessSummary, AppError> {
        let batch_size = BatchSize::new(options.batch_size.or(self.default_batch_size));

        let queued = self.store.fetch_queued(batch_size.get()).await?;
        let mut outcome = DispatchOutcome::new(queued.len());

        if queued.is_empty() {
            tracing::debug!("Notification queue is empty");
            return Ok(outcome.into_summary());
        }

        tracing::info!(
            queued = queued.len(),
            batch_size = batch_size.get(),
            provider = self.provider.name(),
            "Processing notification queue"
        );

        let mut pacer = Pacer::new(self.send_delay);
        for (user_id, notifications) in group_by_recipient(queued) {
            self.process_recipient(user_id, notifications, &mut pacer, &mut outcome)
                .await;
        }

        let summary = outcome.into_summary();
        tracing::info!(
            total = summary.total,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Notification queue run finished"
        );

        Ok(summary)
    }

    async fn process_recipient(
        &self,
        user_id: Uuid,
        notifications: Vec<Notification>,
        pacer: &mut Pacer,
        outcome: &mut DispatchOutcome,
    ) {
        let preference = match self.resolver.resolve(self.store.as_ref(), user_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    count = notifications.len(),
                    error = %e,
                    "Failed to resolve notification preferences"
                );
                let error = format!("Failed to resolve preferences: {}", e);
                for n in &notifications {
                    outcome.record_failure(n.id, error.clone());
                }
                return;
            }
        };

        let batch = policy::apply(&preference, notifications);

        if !batch.skipped.is_empty() {
            self.mark_skipped(user_id, &batch.skipped, outcome).await;
        }

        for notification in &batch.deliver {
            pacer.wait_turn().await;
            self.dispatch(notification, outcome).await;
        }
    }

    /// Drain skipped notifications with a single `IN`-list update.
    async fn mark_skipped(
        &self,
        user_id: Uuid,
        skipped: &[(Notification, SkipReason)],
        outcome: &mut DispatchOutcome,
    ) {
        for (n, reason) in skipped {
            tracing::debug!(
                user_id = %user_id,
                notification_id = %n.id,
                notification_type = %n.notification_type,
                reason = %reason,
                "Skipping notification"
            );
        }

        let ids: Vec<Uuid> = skipped.iter().map(|(n, _)| n.id).collect();
        match self.store.mark_dispatched(&ids, Utc::now()).await {
            Ok(_) => outcome.record_skipped(ids.len()),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    count = ids.len(),
                    error = %e,
                    "Failed to mark skipped notifications"
                );
                let error = format!("Failed to mark skipped notification: {}", e);
                for id in ids {
                    outcome.record_failure(id, error.clone());
                }
            }
        }
    }

    async fn dispatch(&self, notification: &Notification, outcome: &mut DispatchOutcome) {
        let message = PushMessage::from_notification(notification);

        if let Err(e) = self.provider.send(&message).await {
            tracing::warn!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                status = ?e.status(),
                error = %e,
                "Push delivery failed; notification stays queued"
            );
            outcome.record_send_failure(notification.id, e.to_string());
            return;
        }

        outcome.record_sent();

        // Persist per notification so a crash mid-batch cannot re-send earlier items
        if let Err(e) = self
            .store
            .mark_dispatched(&[notification.id], Utc::now())
            .await
        {
            tracing::error!(
                notification_id = %notification.id,
                error = %e,
                "Push delivered but sent_at not persisted; it will be delivered again next run"
            );
        }
    }
}

/// Group by recipient, keeping both recipient order and per-recipient order.
fn group_by_recipient(notifications: Vec<Notification>) -> Vec<(Uuid, Vec<Notification>)> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<(Uuid, Vec<Notification>)> = Vec::new();

    for n in notifications {
        match index.get(&n.user_id) {
            Some(&i) => groups[i].1.push(n),
            None => {
                index.insert(n.user_id, groups.len());
                groups.push((n.user_id, vec![n]));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            title: "t".to_string(),
            message: "m".to_string(),
            notification_type: "achievement".to_string(),
            action_url: None,
            data: serde_json::json!({}),
            is_read: false,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_batch_size_clamping() {
        assert_eq!(BatchSize::new(None).get(), 50);
        assert_eq!(BatchSize::new(Some(0)).get(), 1);
        assert_eq!(BatchSize::new(Some(-7)).get(), 1);
        assert_eq!(BatchSize::new(Some(25)).get(), 25);
        assert_eq!(BatchSize::new(Some(100)).get(), 100);
        assert_eq!(BatchSize::new(Some(5000)).get(), 100);
    }

    #[test]
    fn test_process_options_camel_case() {
        let opts: ProcessOptions = serde_json::from_str(r#"{"batchSize": 10}"#).unwrap();
        assert_eq!(opts.batch_size, Some(10));

        let empty: ProcessOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.batch_size, None);
    }

    #[test]
    fn test_group_by_recipient_preserves_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let batch = vec![notification(a), notification(b), notification(a)];
        let ids: Vec<Uuid> = batch.iter().map(|n| n.id).collect();

        let groups = group_by_recipient(batch);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, a);
        assert_eq!(
            groups[0].1.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![ids[0], ids[2]]
        );
        assert_eq!(groups[1].0, b);
        assert_eq!(groups[1].1[0].id, ids[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_sleeps_between_calls_only() {
        let mut pacer = Pacer::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.wait_turn().await;
        pacer.wait_turn().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }
}
