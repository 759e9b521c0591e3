//! Immutable endpoint configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::expectation::Expectation;
use crate::latency::LatencyUnit;
use crate::status::ComponentStatus;
use crate::template;

/// Side effects an endpoint may request from the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    CreateIncident,
    UpdateStatus,
    PushMetrics,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::CreateIncident => write!(f, "CREATE_INCIDENT"),
            Action::UpdateStatus => write!(f, "UPDATE_STATUS"),
            Action::PushMetrics => write!(f, "PUSH_METRICS"),
        }
    }
}

/// One monitored endpoint. Built once at load time and shared read-only
/// with the endpoint's worker.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Unique key.
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub tls_verify: bool,
    pub timeout: Duration,
    /// Checked in declaration order.
    pub expectations: Vec<Expectation>,
    /// Consecutive failing ticks tolerated before an outage is declared.
    pub allowed_fails: u32,
    pub component_id: u64,
    pub metric_id: Option<u64>,
    pub actions: Vec<Action>,
    pub public_incidents: bool,
    pub latency_unit: LatencyUnit,
    /// Polling interval.
    pub frequency: Duration,
}

impl EndpointConfig {
    /// Create an endpoint with defaults: `GET`, TLS verification on, 1s
    /// timeout, 30s frequency, no expectations and no actions.
    pub fn new(name: impl Into<String>, url: impl Into<String>, component_id: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            tls_verify: true,
            timeout: Duration::from_secs(1),
            expectations: Vec::new(),
            allowed_fails: 0,
            component_id,
            metric_id: None,
            actions: Vec::new(),
            public_incidents: true,
            latency_unit: LatencyUnit::default(),
            frequency: Duration::from_secs(30),
        }
    }

    pub fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    pub fn with_allowed_fails(mut self, allowed_fails: u32) -> Self {
        self.allowed_fails = allowed_fails;
        self
    }

    pub fn with_metric(mut self, metric_id: u64, unit: LatencyUnit) -> Self {
        self.metric_id = Some(metric_id);
        self.latency_unit = unit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Incident titles, rendered with `{name}` set to the endpoint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplates {
    #[serde(default = "default_outage")]
    pub incident_outage: String,

    #[serde(default = "default_operational")]
    pub incident_operational: String,

    #[serde(default = "default_performance")]
    pub incident_performance: String,
}

fn default_outage() -> String {
    "{name} is unavailable".to_string()
}

fn default_operational() -> String {
    "{name} is operational".to_string()
}

fn default_performance() -> String {
    "{name} has degraded performance".to_string()
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            incident_outage: default_outage(),
            incident_operational: default_operational(),
            incident_performance: default_performance(),
        }
    }
}

impl MessageTemplates {
    /// Title announcing that `endpoint` entered `status`.
    pub fn title_for(&self, status: ComponentStatus, endpoint: &str) -> String {
        let template = match status {
            ComponentStatus::Operational => &self.incident_operational,
            ComponentStatus::PerformanceIssues => &self.incident_performance,
            ComponentStatus::PartialOutage
            | ComponentStatus::MajorOutage
            | ComponentStatus::Unknown => &self.incident_outage,
        };
        template::render(template, &[("name", endpoint)])
    }
}
