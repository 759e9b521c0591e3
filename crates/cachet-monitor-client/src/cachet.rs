//! Cachet API client.

#[cfg(test)]
#[path = "cachet_tests.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use cachet_monitor_config::{
    CachetConfig, Config, EndpointSpec, ExpectationSpec, HTTP_STATUS, StatusRangeSpec, TokenSpec,
};
use cachet_monitor_core::{
    Action, ComponentStatus, DispatchError, IncidentSeverity, IncidentStatus, MessageTemplates,
    NewIncident, StatusPageClient,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

const TOKEN_HEADER: &str = "X-Cachet-Token";
const NOT_FOUND: u16 = 404;

/// Per-request limit used by [`CachetClient::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix `http://` when the URL has no scheme.
pub fn normalize_url(url: &str) -> String {
    if url.to_lowercase().starts_with("http") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// A component as listed by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    pub id: u64,
    pub name: String,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub status: Value,
}

fn default_enabled() -> bool {
    true
}

impl Component {
    pub fn status(&self) -> ComponentStatus {
        parse_status(&self.status)
    }
}

/// Cachet encodes statuses as numbers or numeric strings.
fn parse_status(value: &Value) -> ComponentStatus {
    let code = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    code.map(ComponentStatus::from_code)
        .unwrap_or(ComponentStatus::Unknown)
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Client for the Cachet REST API (v1).
#[derive(Clone)]
pub struct CachetClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CachetClient {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(api_url, token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Give up on any request that takes longer than `timeout`.
    pub fn with_timeout(api_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, api_url, token)
    }

    /// Use an existing connection pool.
    pub fn with_client(client: Client, api_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            base_url: normalize_url(api_url).trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.header(TOKEN_HEADER, &self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ClientError> {
        let request = self.client.get(self.url(path)).query(query);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// List every component, following pagination.
    pub async fn get_components(&self) -> Result<Vec<Component>, ClientError> {
        let mut components = Vec::new();
        let mut page: u64 = 1;
        loop {
            let json = self
                .get_json("/components", &[("page", page.to_string())])
                .await?;
            let data = json
                .get("data")
                .cloned()
                .ok_or_else(|| ClientError::InvalidResponse("missing 'data' in component list".to_string()))?;
            let batch: Vec<Component> = serde_json::from_value(data)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
            components.extend(batch);

            let total_pages = json
                .pointer("/meta/pagination/total_pages")
                .and_then(Value::as_u64)
                .unwrap_or(1);
            if page >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(components)
    }

    /// Current status of a component.
    pub async fn get_component_status(&self, component_id: u64) -> Result<ComponentStatus, ClientError> {
        let json = match self
            .get_json(&format!("/components/{}", component_id), &[])
            .await
        {
            Ok(json) => json,
            Err(ClientError::UnexpectedStatus { status: NOT_FOUND, .. }) => {
                return Err(ClientError::ComponentNotFound(component_id));
            }
            Err(e) => return Err(e),
        };
        let status = json
            .pointer("/data/status")
            .ok_or_else(|| ClientError::InvalidResponse("missing 'data.status'".to_string()))?;
        Ok(parse_status(status))
    }

    /// List every metric.
    pub async fn get_metrics(&self) -> Result<Vec<Value>, ClientError> {
        let json = self.get_json("/metrics", &[]).await?;
        match json.get("data") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(ClientError::InvalidResponse("missing 'data' in metric list".to_string())),
        }
    }

    /// Default value of a metric.
    pub async fn get_default_metric_value(&self, metric_id: u64) -> Result<Value, ClientError> {
        let json = match self.get_json(&format!("/metrics/{}", metric_id), &[]).await {
            Ok(json) => json,
            Err(ClientError::UnexpectedStatus { status: NOT_FOUND, .. }) => {
                return Err(ClientError::MetricNotFound(metric_id));
            }
            Err(e) => return Err(e),
        };
        json.pointer("/data/default_value")
            .cloned()
            .ok_or_else(|| ClientError::InvalidResponse("missing 'data.default_value'".to_string()))
    }

    /// Build a configuration with one endpoint per enabled component.
    pub async fn generate_config(&self) -> Result<Config, ClientError> {
        let components = self.get_components().await?;
        let endpoints = components
            .into_iter()
            .filter(|c| c.enabled)
            .map(|component| {
                let mut endpoint = EndpointSpec::new(
                    component.name,
                    component.link.unwrap_or_default(),
                    component.id,
                );
                endpoint.expectations = vec![ExpectationSpec {
                    kind: HTTP_STATUS.to_string(),
                    status_range: Some(StatusRangeSpec::Range("200-300".to_string())),
                    incident: Some(IncidentSeverity::Major),
                    ..Default::default()
                }];
                endpoint.actions = vec![Action::CreateIncident, Action::UpdateStatus];
                endpoint
            })
            .collect();

        Ok(Config {
            cachet: CachetConfig {
                api_url: self.base_url.clone(),
                token: TokenSpec::Plain(self.token.clone()),
            },
            endpoints,
            webhooks: Vec::new(),
            messages: MessageTemplates::default(),
        })
    }

    async fn post_incident(&self, incident: &NewIncident) -> Result<u64, ClientError> {
        let query = [
            ("name", incident.name.clone()),
            ("message", incident.message.clone()),
            ("status", incident.status.code().to_string()),
            ("visible", flag(incident.visible).to_string()),
            ("component_id", incident.component_id.to_string()),
            ("component_status", incident.component_status.code().to_string()),
            ("notify", flag(true).to_string()),
        ];
        let response = self
            .send(self.client.post(self.url("/incidents")).query(&query))
            .await?;
        let json: Value = response.json().await?;
        json.pointer("/data/id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::InvalidResponse("missing 'data.id' in incident response".to_string()))
    }
}

#[async_trait]
impl StatusPageClient for CachetClient {
    async fn create_incident(&self, incident: &NewIncident) -> Result<u64, DispatchError> {
        let id = self.post_incident(incident).await?;
        debug!(incident_id = id, component_id = incident.component_id, "Created incident");
        Ok(id)
    }

    async fn resolve_incident(&self, incident_id: u64, message: &str) -> Result<(), DispatchError> {
        let query = [
            ("status", IncidentStatus::Fixed.code().to_string()),
            ("message", message.to_string()),
        ];
        let request = self
            .client
            .post(self.url(&format!("/incidents/{}/updates", incident_id)))
            .query(&query);
        self.send(request).await?;
        Ok(())
    }

    async fn update_component_status(
        &self,
        component_id: u64,
        status: ComponentStatus,
    ) -> Result<(), DispatchError> {
        let query = [
            ("id", component_id.to_string()),
            ("status", status.code().to_string()),
        ];
        let request = self
            .client
            .put(self.url(&format!("/components/{}", component_id)))
            .query(&query);
        self.send(request).await?;
        Ok(())
    }

    async fn push_metric(&self, metric_id: u64, value: f64, timestamp: i64) -> Result<(), DispatchError> {
        let query = [
            ("id", metric_id.to_string()),
            ("value", value.to_string()),
            ("timestamp", timestamp.to_string()),
        ];
        let request = self
            .client
            .post(self.url(&format!("/metrics/{}/points", metric_id)))
            .query(&query);
        self.send(request).await?;
        Ok(())
    }
}
