use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use weighin_common::config::{AppConfig, PushProviderKind};
use weighin_common::error::AppError;
use weighin_common::types::Notification;

use crate::error::DispatchError;
use crate::novu::NovuProvider;
use crate::onesignal::OneSignalProvider;

/// Data envelope delivered alongside the visible push content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushData {
    pub notification_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

/// Provider-agnostic push message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    /// External user id the provider knows the recipient by
    pub recipient: String,
    pub title: String,
    pub body: String,
    pub data: PushData,
}

impl PushMessage {
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            recipient: notification.user_id.to_string(),
            title: notification.title.clone(),
            body: notification.message.clone(),
            data: PushData {
                notification_id: notification.id,
                notification_type: notification.notification_type.clone(),
                action_url: notification.action_url.clone(),
            },
        }
    }
}

/// Delivers one message per call to an external push service.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Send a single message. `Ok` means the provider accepted it (2xx).
    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError>;
}

/// Build the configured provider.
///
/// Missing credentials are a configuration error: nothing is processed
/// without a usable provider.
pub fn build_provider(config: &AppConfig) -> Result<Box<dyn PushProvider>, AppError> {
    let client = http_client(Duration::from_secs(config.push_timeout_secs))?;

    match config.push_provider {
        PushProviderKind::OneSignal => {
            let app_id = config.onesignal_app_id.clone().ok_or_else(|| {
                AppError::Config("ONESIGNAL_APP_ID is required for the onesignal provider".into())
            })?;
            let api_key = config.onesignal_rest_api_key.clone().ok_or_else(|| {
                AppError::Config(
                    "ONESIGNAL_REST_API_KEY is required for the onesignal provider".into(),
                )
            })?;
            Ok(Box::new(OneSignalProvider::new(
                client,
                &config.onesignal_api_url,
                app_id,
                api_key,
            )))
        }
        PushProviderKind::Novu => {
            let api_key = config.novu_api_key.clone().ok_or_else(|| {
                AppError::Config("NOVU_API_KEY is required for the novu provider".into())
            })?;
            Ok(Box::new(NovuProvider::new(
                client,
                &config.novu_api_url,
                api_key,
                config.novu_workflow_id.clone(),
            )))
        }
    }
}

/// Shared reqwest client with a per-request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// POST a JSON body and map non-2xx responses to [`DispatchError::Rejected`].
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    authorization: &str,
    body: &T,
) -> Result<(), DispatchError> {
    let response = client
        .post(url)
        .header(reqwest::header::AUTHORIZATION, authorization)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable response body: {}>", e));

    Err(DispatchError::Rejected {
        status: status.as_u16(),
        body,
    })
}
