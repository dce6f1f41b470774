use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info};

use stockwatch_alerts::MessagePayload;

use super::{Notifier, NotifierError};

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-space incoming webhook: POSTs `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "webhook request failed");
                NotifierError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            info!(bytes = payload.len(), "webhook message sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "webhook rejected message");
            Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
