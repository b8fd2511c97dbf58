//! Notification routes: enqueue (backend jobs) and inbox access (users).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use weighin_common::error::AppError;
use weighin_common::types::{NewNotification, Notification};
use weighin_engine::notification::NotificationService;

use crate::middleware::auth::{AuthUser, CronAuth};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(enqueue_notification))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", post(mark_read))
}

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
}

/// POST /api/notifications: Queue a notification for a user.
async fn enqueue_notification(
    State(state): State<AppState>,
    _cron: CronAuth,
    Json(params): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = NotificationService::enqueue(&state.pool, &params).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// GET /api/notifications: The authenticated user's notifications.
async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = NotificationService::list_by_user(
        &state.pool,
        auth.user_id,
        query.unread_only.unwrap_or(false),
        query.limit,
    )
    .await?;
    Ok(Json(notifications))
}

/// POST /api/notifications/{id}/read: Mark a notification as read.
async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if NotificationService::mark_read(&state.pool, id, auth.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Notification {} not found", id)))
    }
}
