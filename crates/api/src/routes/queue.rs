//! Queue trigger: runs one pass of the notification queue processor.
//!
//! Called by an external scheduler with the cron secret. The run lock makes
//! overlapping triggers fail fast with 409 instead of double-sending.
//!
//! The run itself is spawned onto its own task: a caller that disconnects
//! mid-batch must not cancel it between a send and its `sent_at` write, or
//! leave the lock held until it expires.

use std::future::Future;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use weighin_common::error::AppError;
use weighin_common::lock::RunLock;
use weighin_engine::{ProcessOptions, ProcessSummary};

use crate::middleware::auth::CronAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications/queue/process", post(process_queue))
}

/// Body is optional: `{}` or empty means "use the default batch size".
fn parse_options(body: &[u8]) -> Result<ProcessOptions, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProcessOptions::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

/// POST /api/notifications/queue/process: Drain one batch of the queue.
async fn process_queue(
    State(state): State<AppState>,
    _cron: CronAuth,
    body: Bytes,
) -> Result<Json<ProcessSummary>, AppError> {
    let options = parse_options(&body)?;

    let mut redis = state.redis.clone();
    let lock = RunLock::notification_queue(state.config.queue_lock_ttl_secs);
    if !lock.try_acquire(&mut redis).await? {
        return Err(AppError::Conflict(
            "Notification queue is already being processed".to_string(),
        ));
    }

    let processor = state.processor.clone();
    let summary = run_detached(async move {
        let result = processor.process(options).await;

        if let Err(e) = lock.release(&mut redis).await {
            tracing::warn!(error = %e, "Failed to release notification queue lock");
        }

        result
    })
    .await?;

    Ok(Json(summary))
}

/// Run `fut` to completion on a separate task, even if the caller is dropped.
async fn run_detached<T, F>(fut: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| AppError::Internal(format!("Queue run task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_detached_run_survives_dropped_caller() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let caller = run_detached(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        // Caller gives up long before the run ends
        assert!(
            tokio::time::timeout(Duration::from_millis(5), caller)
                .await
                .is_err()
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_detached_run_returns_result() {
        let value = run_detached(async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = run_detached(async { Err::<(), _>(AppError::Conflict("busy".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_panicking_run_maps_to_internal_error() {
        let err = run_detached(async {
            if true {
                panic!("boom");
            }
            Ok::<(), AppError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_parse_empty_body() {
        assert_eq!(parse_options(b"").unwrap().batch_size, None);
        assert_eq!(parse_options(b"  \n").unwrap().batch_size, None);
    }

    #[test]
    fn test_parse_batch_size() {
        assert_eq!(
            parse_options(br#"{"batchSize": 20}"#).unwrap().batch_size,
            Some(20)
        );
    }

    #[test]
    fn test_parse_invalid_body() {
        assert!(matches!(
            parse_options(b"not json"),
            Err(AppError::Validation(_))
        ));
    }
}
