//! Configuration schema definitions.
//!
//! These types mirror the YAML file one to one. They are converted into the
//! engine's types by [`ResolvedConfig`](crate::ResolvedConfig) after
//! validation.

use std::collections::HashMap;

use cachet_monitor_core::{Action, IncidentSeverity, MessageTemplates};
use serde::{Deserialize, Serialize};

use crate::token::TokenSpec;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cachet: CachetConfig,

    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhooks: Vec<WebhookSpec>,

    #[serde(default)]
    pub messages: MessageTemplates,
}

/// Status page connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachetConfig {
    pub api_url: String,
    pub token: TokenSpec,
}

/// One monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub name: String,
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Seconds; fractional values allowed.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    #[serde(default, rename = "expectation")]
    pub expectations: Vec<ExpectationSpec>,

    #[serde(default)]
    pub allowed_fails: u32,

    /// Polling interval in seconds.
    pub frequency: f64,

    pub component_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<u64>,

    #[serde(default, rename = "action")]
    pub actions: Vec<Action>,

    #[serde(default = "default_true")]
    pub public_incidents: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_unit: Option<String>,
}

impl EndpointSpec {
    /// Endpoint with the defaults used by `generate-config`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, component_id: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: default_method(),
            headers: HashMap::new(),
            tls_verify: true,
            timeout: default_timeout(),
            expectations: Vec::new(),
            allowed_fails: 0,
            frequency: 30.0,
            component_id,
            metric_id: None,
            actions: Vec::new(),
            public_incidents: true,
            latency_unit: None,
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    1.0
}

/// One expectation entry. Which fields are required depends on `type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectationSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_range: Option<StatusRangeSpec>,

    /// Seconds for `LATENCY`; accepted but unused for `REGEX`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Severity override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident: Option<IncidentSeverity>,
}

pub const HTTP_STATUS: &str = "HTTP_STATUS";
pub const LATENCY: &str = "LATENCY";
pub const REGEX: &str = "REGEX";

/// `200` or `"200-300"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusRangeSpec {
    Code(u16),
    Range(String),
}

impl std::fmt::Display for StatusRangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusRangeSpec::Code(code) => write!(f, "{}", code),
            StatusRangeSpec::Range(range) => write!(f, "{}", range),
        }
    }
}

/// Webhook entry. Parameter values may be any YAML scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSpec {
    pub url: String,

    #[serde(default)]
    pub params: HashMap<String, ParamValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}
