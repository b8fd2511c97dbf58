//! Storage seam for the queue processor.
//!
//! The processor only needs four operations on two tables. They sit behind
//! [`NotificationStore`] so the pipeline can run against Postgres in
//! production and an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use weighin_common::error::AppError;
use weighin_common::types::{Notification, NotificationPreference};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Queued notifications (`sent_at IS NULL`, unread), oldest first.
    async fn fetch_queued(&self, limit: i64) -> Result<Vec<Notification>, AppError>;

    async fn find_preference(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreference>, AppError>;

    /// Insert a preference row. If a row for the same user already exists,
    /// the existing row is returned instead.
    async fn insert_preference(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, AppError>;

    /// Set `sent_at` on the given notifications that do not have one yet.
    /// Returns the number of rows changed.
    async fn mark_dispatched(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn fetch_queued(&self, limit: i64) -> Result<Vec<Notification>, AppError> {
        let rows: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT *
            FROM notifications
            WHERE sent_at IS NULL
              AND is_read = false
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_preference(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreference>, AppError> {
        let pref: Option<NotificationPreference> =
            sqlx::query_as("SELECT * FROM notification_preferences WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(pref)
    }

    async fn insert_preference(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, AppError> {
        let inserted: Option<NotificationPreference> = sqlx::query_as(
            r#"
            INSERT INTO notification_preferences (
                id, user_id, enabled, push_enabled, in_app_enabled,
                daily_reminders, new_messages, progress_updates,
                competition_updates, leaderboard_changes, max_per_day,
                digest_frequency, quiet_hours_start, quiet_hours_end,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(preference.id)
        .bind(preference.user_id)
        .bind(preference.enabled)
        .bind(preference.push_enabled)
        .bind(preference.in_app_enabled)
        .bind(preference.daily_reminders)
        .bind(preference.new_messages)
        .bind(preference.progress_updates)
        .bind(preference.competition_updates)
        .bind(preference.leaderboard_changes)
        .bind(preference.max_per_day)
        .bind(preference.digest_frequency.to_string())
        .bind(preference.quiet_hours_start)
        .bind(preference.quiet_hours_end)
        .bind(preference.created_at)
        .bind(preference.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        // Lost the race against a concurrent insert for the same user
        tracing::debug!(user_id = %preference.user_id, "Preference row already existed");
        self.find_preference(preference.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Preference row for user {} conflicted but could not be read back",
                    preference.user_id
                ))
            })
    }

    async fn mark_dispatched(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE notifications SET sent_at = $1 WHERE id = ANY($2) AND sent_at IS NULL",
        )
        .bind(at)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
