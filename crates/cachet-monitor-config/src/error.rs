//! Configuration errors.

use cachet_monitor_core::MonitorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Configuration is invalid:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),

    #[error("No Cachet token could be resolved from the configured providers")]
    TokenNotFound,

    #[error("Unsupported token provider type: {0}")]
    UnsupportedTokenProvider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yml::Error),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}
