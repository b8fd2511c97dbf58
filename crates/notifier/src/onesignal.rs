//! OneSignal REST delivery.
//!
//! Users are targeted by external user id, which the mobile and web clients
//! set to the account UUID at login.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DispatchError;
use crate::provider::{PushData, PushMessage, PushProvider, post_json};

const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Serialize)]
struct OneSignalRequest<'a> {
    app_id: &'a str,
    include_external_user_ids: [&'a str; 1],
    channel_for_external_user_ids: &'static str,
    headings: HashMap<&'static str, &'a str>,
    contents: HashMap<&'static str, &'a str>,
    data: &'a PushData,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

pub struct OneSignalProvider {
    client: reqwest::Client,
    endpoint: String,
    app_id: String,
    rest_api_key: String,
}

impl OneSignalProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        app_id: String,
        rest_api_key: String,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/v1/notifications", base_url.trim_end_matches('/')),
            app_id,
            rest_api_key,
        }
    }

    fn request<'a>(&'a self, message: &'a PushMessage) -> OneSignalRequest<'a> {
        OneSignalRequest {
            app_id: &self.app_id,
            include_external_user_ids: [message.recipient.as_str()],
            channel_for_external_user_ids: "push",
            headings: HashMap::from([(DEFAULT_LANGUAGE, message.title.as_str())]),
            contents: HashMap::from([(DEFAULT_LANGUAGE, message.body.as_str())]),
            data: &message.data,
            url: message.data.action_url.as_deref(),
        }
    }
}

#[async_trait]
impl PushProvider for OneSignalProvider {
    fn name(&self) -> &'static str {
        "onesignal"
    }

    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError> {
        let authorization = format!("Basic {}", self.rest_api_key);
        post_json(
            &self.client,
            &self.endpoint,
            &authorization,
            &self.request(message),
        )
        .await?;

        tracing::debug!(
            recipient = %message.recipient,
            notification_id = %message.data.notification_id,
            "Push accepted by OneSignal"
        );
        Ok(())
    }
}
