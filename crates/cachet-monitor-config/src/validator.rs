//! Configuration validation.

use std::collections::HashSet;
use std::str::FromStr;

use cachet_monitor_core::{Action, Expectation, LatencyUnit, StatusRange};

use crate::error::ConfigError;
use crate::schema::{Config, EndpointSpec, ExpectationSpec, HTTP_STATUS, LATENCY, REGEX, StatusRangeSpec};
use crate::token::TokenSpec;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn collected errors into a [`ConfigError::ValidationFailed`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ConfigError::ValidationFailed(
                self.errors.iter().map(|e| e.to_string()).collect(),
            ))
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_cachet(config, &mut result);

        if config.endpoints.is_empty() {
            result.add_error(ValidationError::new(
                "endpoints",
                "At least one endpoint is required",
            ));
        }

        let mut names = HashSet::new();
        for (index, endpoint) in config.endpoints.iter().enumerate() {
            let path = format!("endpoints[{}]", index);
            if !names.insert(endpoint.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate endpoint name '{}'", endpoint.name),
                ));
            }
            Self::validate_endpoint(&path, endpoint, &mut result);
        }

        for (index, webhook) in config.webhooks.iter().enumerate() {
            if webhook.url.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("webhooks[{}].url", index),
                    "Webhook URL cannot be empty",
                ));
            }
        }

        result
    }

    fn validate_cachet(config: &Config, result: &mut ValidationResult) {
        if config.cachet.api_url.trim().is_empty() {
            result.add_error(ValidationError::new(
                "cachet.api_url",
                "API URL cannot be empty",
            ));
        }

        match &config.cachet.token {
            TokenSpec::Plain(_) => {}
            TokenSpec::Providers(providers) => {
                if providers.is_empty() {
                    result.add_error(ValidationError::new(
                        "cachet.token",
                        "Token provider list cannot be empty",
                    ));
                }
                for (index, provider) in providers.iter().enumerate() {
                    if let Err(e) = provider.check_supported() {
                        result.add_error(ValidationError::new(
                            format!("cachet.token[{}].type", index),
                            e.to_string(),
                        ));
                    }
                }
            }
        }
    }

    fn validate_endpoint(path: &str, endpoint: &EndpointSpec, result: &mut ValidationResult) {
        if endpoint.name.trim().is_empty() {
            result.add_error(ValidationError::new(
                format!("{}.name", path),
                "Endpoint name cannot be empty",
            ));
        }

        if endpoint.url.trim().is_empty() {
            result.add_error(ValidationError::new(
                format!("{}.url", path),
                "URL cannot be empty",
            ));
        } else if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            result.add_error(ValidationError::new(
                format!("{}.url", path),
                format!("URL must start with http:// or https://: {}", endpoint.url),
            ));
        }

        if !(endpoint.timeout.is_finite() && endpoint.timeout > 0.0) {
            result.add_error(ValidationError::new(
                format!("{}.timeout", path),
                "timeout must be greater than 0",
            ));
        }

        if !(endpoint.frequency.is_finite() && endpoint.frequency > 0.0) {
            result.add_error(ValidationError::new(
                format!("{}.frequency", path),
                "frequency must be greater than 0",
            ));
        }

        if endpoint.expectations.is_empty() {
            result.add_error(ValidationError::new(
                format!("{}.expectation", path),
                "At least one expectation is required",
            ));
        }
        for (index, expectation) in endpoint.expectations.iter().enumerate() {
            let path = format!("{}.expectation[{}]", path, index);
            Self::validate_expectation(&path, expectation, result);
        }

        if let Some(unit) = &endpoint.latency_unit {
            if let Err(e) = LatencyUnit::from_str(unit) {
                result.add_error(ValidationError::new(
                    format!("{}.latency_unit", path),
                    e.to_string(),
                ));
            }
        }

        let pushes_metrics = endpoint.actions.contains(&Action::PushMetrics);
        match (endpoint.metric_id, pushes_metrics) {
            (Some(_), false) => result.add_warning(ValidationWarning::new(
                format!("{}.metric_id", path),
                "metric_id is set but PUSH_METRICS is not enabled; no metrics will be pushed",
            )),
            (None, true) => result.add_warning(ValidationWarning::new(
                format!("{}.action", path),
                "PUSH_METRICS is enabled without a metric_id; no metrics will be pushed",
            )),
            _ => {}
        }
    }

    fn validate_expectation(path: &str, spec: &ExpectationSpec, result: &mut ValidationResult) {
        match spec.kind.as_str() {
            HTTP_STATUS => match &spec.status_range {
                None => result.add_error(ValidationError::new(
                    format!("{}.status_range", path),
                    "HTTP_STATUS expectation requires status_range",
                )),
                Some(range) => {
                    if let Err(e) = parse_status_range(range) {
                        result.add_error(ValidationError::new(
                            format!("{}.status_range", path),
                            e.to_string(),
                        ));
                    }
                }
            },
            LATENCY => match spec.threshold {
                Some(threshold) if threshold.is_finite() && threshold > 0.0 => {}
                Some(_) => result.add_error(ValidationError::new(
                    format!("{}.threshold", path),
                    "threshold must be greater than 0",
                )),
                None => result.add_error(ValidationError::new(
                    format!("{}.threshold", path),
                    "LATENCY expectation requires threshold",
                )),
            },
            REGEX => {
                match &spec.regex {
                    None => result.add_error(ValidationError::new(
                        format!("{}.regex", path),
                        "REGEX expectation requires regex",
                    )),
                    Some(pattern) => {
                        if let Err(e) = Expectation::regex(pattern.as_str(), None, None) {
                            result.add_error(ValidationError::new(
                                format!("{}.regex", path),
                                e.to_string(),
                            ));
                        }
                    }
                }
                if spec.threshold.is_some() {
                    result.add_warning(ValidationWarning::new(
                        format!("{}.threshold", path),
                        "threshold has no effect on REGEX expectations and is ignored",
                    ));
                }
            }
            other => result.add_error(ValidationError::new(
                format!("{}.type", path),
                format!(
                    "Unknown expectation type '{}', expected one of {}, {}, {}",
                    other, HTTP_STATUS, LATENCY, REGEX
                ),
            )),
        }
    }
}

pub(crate) fn parse_status_range(spec: &StatusRangeSpec) -> Result<StatusRange, ConfigError> {
    let range = match spec {
        StatusRangeSpec::Code(code) => StatusRange::single(*code)?,
        StatusRangeSpec::Range(text) => StatusRange::from_str(text)?,
    };
    Ok(range)
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
