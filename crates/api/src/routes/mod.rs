pub mod health;
pub mod notifications;
pub mod preferences;
pub mod queue;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(queue::router())
        .merge(notifications::router())
        .merge(preferences::router())
        .with_state(state)
}
