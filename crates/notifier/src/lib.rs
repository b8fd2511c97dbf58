//! Push provider delivery.
//!
//! The queue processor talks to a single [`PushProvider`]. Two HTTP
//! implementations exist, selected by `PUSH_PROVIDER`:
//! - [`OneSignalProvider`] (REST `POST /api/v1/notifications`)
//! - [`NovuProvider`] (REST `POST /v1/events/trigger`)
//!
//! Providers make exactly one call per message. Retries are the caller's
//! concern: a failed notification stays queued and is picked up next run.

pub mod error;
pub mod novu;
pub mod onesignal;
pub mod provider;

pub use error::DispatchError;
pub use novu::NovuProvider;
pub use onesignal::OneSignalProvider;
pub use provider::{PushData, PushMessage, PushProvider, build_provider};
