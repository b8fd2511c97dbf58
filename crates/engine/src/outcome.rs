//! Per-run accounting for the queue processor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One notification that could not be handled this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    pub notification_id: Uuid,
    pub error: String,
}

/// Result of a single processor invocation, returned to the caller.
///
/// Advisory only; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub success: bool,
    pub message: String,
    /// Notifications handed to the provider (sent + send failures)
    pub processed: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Size of the fetched batch
    pub total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DispatchFailure>,
}

/// Accumulator filled in while a batch is processed.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    total: usize,
    processed: usize,
    sent: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<DispatchFailure>,
}

impl DispatchOutcome {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_sent(&mut self) {
        self.processed += 1;
        self.sent += 1;
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.skipped += count;
    }

    /// The provider refused or could not be reached.
    pub fn record_send_failure(&mut self, notification_id: Uuid, error: impl Into<String>) {
        self.processed += 1;
        self.record_failure(notification_id, error);
    }

    /// Failure before any provider call (preferences, skip bookkeeping).
    pub fn record_failure(&mut self, notification_id: Uuid, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(DispatchFailure {
            notification_id,
            error: error.into(),
        });
    }

    pub fn into_summary(self) -> ProcessSummary {
        let message = if self.total == 0 {
            "No queued notifications".to_string()
        } else {
            format!(
                "Processed {} queued notifications: {} sent, {} skipped, {} failed",
                self.total, self.sent, self.skipped, self.failed
            )
        };

        ProcessSummary {
            success: true,
            message,
            processed: self.processed,
            sent: self.sent,
            skipped: self.skipped,
            failed: self.failed,
            total: self.total,
            errors: self.errors,
        }
    }
}
