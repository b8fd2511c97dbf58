//! Notification service: enqueue, list and mark-read operations used by the
//! application side, plus preference lookup for the signed-in user.
//!
//! Competition and weigh-in flows call [`NotificationService::enqueue`]; the
//! queue processor picks the rows up on its next run.

use sqlx::PgPool;
use uuid::Uuid;

use weighin_common::error::AppError;
use weighin_common::types::{NewNotification, Notification, NotificationPreference};

use crate::preferences::PreferenceResolver;
use crate::store::PgNotificationStore;

/// Service layer for notification rows.
pub struct NotificationService;

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

impl NotificationService {
    /// Queue a notification for delivery.
    pub async fn enqueue(pool: &PgPool, params: &NewNotification) -> Result<Notification, AppError> {
        Self::validate(params)?;

        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, title, message, notification_type, action_url, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.title.trim())
        .bind(params.message.trim())
        .bind(params.notification_type.trim())
        .bind(params.action_url.as_deref())
        .bind(params.data.clone().unwrap_or_else(|| serde_json::json!({})))
        .fetch_one(pool)
        .await?;

        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            "Notification queued"
        );

        Ok(notification)
    }

    fn validate(params: &NewNotification) -> Result<(), AppError> {
        if params.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if params.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        if params.notification_type.trim().is_empty() {
            return Err(AppError::Validation(
                "notification_type must not be empty".to_string(),
            ));
        }
        if let Some(data) = &params.data
            && !data.is_object()
        {
            return Err(AppError::Validation("data must be a JSON object".to_string()));
        }
        Ok(())
    }

    /// List a user's notifications, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        unread_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let rows: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT *
            FROM notifications
            WHERE user_id = $1
              AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Mark one of the user's notifications as read. Returns false if no
    /// such notification belongs to the user.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The user's preferences, created with defaults on first access.
    pub async fn preferences(
        pool: &PgPool,
        resolver: &PreferenceResolver,
        user_id: Uuid,
    ) -> Result<NotificationPreference, AppError> {
        let store = PgNotificationStore::new(pool.clone());
        resolver.resolve(&store, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NewNotification {
        NewNotification {
            user_id: Uuid::new_v4(),
            title: "You joined Summer Shred".to_string(),
            message: "The competition starts Monday".to_string(),
            notification_type: "competition_joined".to_string(),
            action_url: None,
            data: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_params() {
        assert!(NotificationService::validate(&params()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut p = params();
        p.title = "   ".to_string();
        assert!(matches!(
            NotificationService::validate(&p),
            Err(AppError::Validation(_))
        ));

        let mut p = params();
        p.notification_type = String::new();
        assert!(NotificationService::validate(&p).is_err());
    }

    #[test]
    fn test_validate_rejects_non_object_data() {
        let mut p = params();
        p.data = Some(serde_json::json!([1, 2, 3]));
        assert!(NotificationService::validate(&p).is_err());
    }
}
