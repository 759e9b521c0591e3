//! Conversion of a validated [`Config`] into engine types.

use std::str::FromStr;
use std::time::Duration;

use cachet_monitor_core::{
    EndpointConfig, Expectation, LatencyUnit, MessageTemplates, WebhookConfig,
};

use crate::error::ConfigError;
use crate::schema::{Config, EndpointSpec, ExpectationSpec, HTTP_STATUS, LATENCY, REGEX, WebhookSpec};
use crate::validator::{ConfigValidator, ValidationWarning, parse_status_range};

/// Everything the monitor needs at runtime.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub token: String,
    pub endpoints: Vec<EndpointConfig>,
    pub webhooks: Vec<WebhookConfig>,
    pub messages: MessageTemplates,
    /// Non-fatal findings of validation.
    pub warnings: Vec<ValidationWarning>,
}

impl ResolvedConfig {
    /// Validate `config`, resolve the API token and build every endpoint.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let warnings = ConfigValidator::validate(config).into_result()?;
        let token = config.cachet.token.resolve()?;

        let endpoints = config
            .endpoints
            .iter()
            .map(build_endpoint)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            api_url: config.cachet.api_url.clone(),
            token,
            endpoints,
            webhooks: config.webhooks.iter().map(build_webhook).collect(),
            messages: config.messages.clone(),
            warnings,
        })
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn build_endpoint(spec: &EndpointSpec) -> Result<EndpointConfig, ConfigError> {
    let expectations = spec
        .expectations
        .iter()
        .map(build_expectation)
        .collect::<Result<Vec<_>, _>>()?;

    let latency_unit = match &spec.latency_unit {
        Some(unit) => LatencyUnit::from_str(unit)?,
        None => LatencyUnit::default(),
    };

    let mut endpoint = EndpointConfig::new(&spec.name, &spec.url, spec.component_id)
        .with_timeout(seconds("timeout", spec.timeout)?)
        .with_frequency(seconds("frequency", spec.frequency)?)
        .with_allowed_fails(spec.allowed_fails);
    endpoint.method = spec.method.to_uppercase();
    endpoint.headers = spec.headers.clone();
    endpoint.tls_verify = spec.tls_verify;
    endpoint.expectations = expectations;
    endpoint.metric_id = spec.metric_id;
    endpoint.latency_unit = latency_unit;
    endpoint.public_incidents = spec.public_incidents;
    for action in &spec.actions {
        endpoint = endpoint.with_action(*action);
    }

    Ok(endpoint)
}

fn build_expectation(spec: &ExpectationSpec) -> Result<Expectation, ConfigError> {
    let missing = |field: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("required for {} expectations", spec.kind),
    };

    match spec.kind.as_str() {
        HTTP_STATUS => {
            let range = spec.status_range.as_ref().ok_or_else(|| missing("status_range"))?;
            Ok(Expectation::http_status(parse_status_range(range)?, spec.incident))
        }
        LATENCY => {
            let threshold = spec.threshold.ok_or_else(|| missing("threshold"))?;
            Ok(Expectation::latency(seconds("threshold", threshold)?, spec.incident))
        }
        REGEX => {
            let pattern = spec.regex.as_deref().ok_or_else(|| missing("regex"))?;
            Ok(Expectation::regex(pattern, spec.threshold, spec.incident)?)
        }
        other => Err(ConfigError::InvalidValue {
            field: "type".to_string(),
            message: format!("unknown expectation type '{}'", other),
        }),
    }
}

fn build_webhook(spec: &WebhookSpec) -> WebhookConfig {
    spec.params
        .iter()
        .fold(WebhookConfig::new(&spec.url), |webhook, (key, value)| {
            webhook.with_param(key, value.to_string())
        })
}
