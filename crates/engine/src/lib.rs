pub mod notification;
pub mod outcome;
pub mod policy;
pub mod preferences;
pub mod processor;
pub mod store;

pub use outcome::{DispatchFailure, DispatchOutcome, ProcessSummary};
pub use processor::{BatchSize, ProcessOptions, QueueProcessor};
pub use store::{NotificationStore, PgNotificationStore};
