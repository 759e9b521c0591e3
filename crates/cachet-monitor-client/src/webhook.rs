//! Webhook delivery.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cachet_monitor_core::{DispatchError, WebhookNotifier};
use reqwest::Client;
use tracing::debug;

use crate::error::ClientError;

/// Posts rendered webhooks with their parameters in the query string.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookNotifier for WebhookClient {
    async fn notify(&self, url: &str, params: &HashMap<String, String>) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(url)
            .query(params)
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook delivered successfully to {}", url);
        Ok(())
    }
}
