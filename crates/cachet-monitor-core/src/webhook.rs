//! Outbound webhook notifications.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::template;

/// A webhook fired on every status transition.
///
/// `{title}` and `{message}` are interpolated into the URL and every
/// parameter value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Render URL and parameters for one notification.
    ///
    /// An empty `message` falls back to `title`.
    pub fn render(&self, title: &str, message: &str) -> (String, HashMap<String, String>) {
        let message = if message.is_empty() { title } else { message };
        let values = [("title", title), ("message", message)];

        let url = template::render(&self.url, &values);
        let params = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), template::render(v, &values)))
            .collect();
        (url, params)
    }
}

/// Delivers a rendered webhook request.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, url: &str, params: &HashMap<String, String>) -> Result<(), DispatchError>;
}
