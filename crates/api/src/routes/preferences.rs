//! Notification preference lookup for the signed-in user.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use weighin_common::error::AppError;
use weighin_common::types::NotificationPreference;
use weighin_engine::notification::NotificationService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications/preferences", get(get_preferences))
}

/// GET /api/notifications/preferences: Current preferences, defaults on first call.
async fn get_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<NotificationPreference>, AppError> {
    let pref =
        NotificationService::preferences(&state.pool, &state.preferences, auth.user_id).await?;
    Ok(Json(pref))
}
