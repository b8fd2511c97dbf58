//! Novu event-trigger delivery.
//!
//! Every notification triggers the same workflow; the workflow template in
//! Novu renders `payload.title` / `payload.body` into its push step.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DispatchError;
use crate::provider::{PushData, PushMessage, PushProvider, post_json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Subscriber<'a> {
    subscriber_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TriggerPayload<'a> {
    title: &'a str,
    body: &'a str,
    data: &'a PushData,
}

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    name: &'a str,
    to: Subscriber<'a>,
    payload: TriggerPayload<'a>,
}

pub struct NovuProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    workflow_id: String,
}

impl NovuProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: String,
        workflow_id: String,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/events/trigger", base_url.trim_end_matches('/')),
            api_key,
            workflow_id,
        }
    }
}

#[async_trait]
impl PushProvider for NovuProvider {
    fn name(&self) -> &'static str {
        "novu"
    }

    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError> {
        let request = TriggerRequest {
            name: &self.workflow_id,
            to: Subscriber {
                subscriber_id: &message.recipient,
            },
            payload: TriggerPayload {
                title: &message.title,
                body: &message.body,
                data: &message.data,
            },
        };
        let authorization = format!("ApiKey {}", self.api_key);

        post_json(&self.client, &self.endpoint, &authorization, &request).await?;

        tracing::debug!(
            recipient = %message.recipient,
            workflow = %self.workflow_id,
            "Novu workflow triggered"
        );
        Ok(())
    }
}
