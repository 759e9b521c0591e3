//! Cachet API token resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable that overrides a plain string token.
pub const TOKEN_ENV_VAR: &str = "CACHET_TOKEN";

/// The `token` field: either the token itself or an ordered provider list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenSpec {
    Plain(String),
    Providers(Vec<TokenProvider>),
}

/// One token source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProvider {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

pub const ENVIRONMENT_VARIABLE: &str = "ENVIRONMENT_VARIABLE";
pub const TOKEN: &str = "TOKEN";
pub const AWS_SECRETS_MANAGER: &str = "AWS_SECRETS_MANAGER";

impl TokenProvider {
    /// Reject provider types this build cannot read from.
    pub fn check_supported(&self) -> Result<(), ConfigError> {
        match self.kind.as_str() {
            ENVIRONMENT_VARIABLE | TOKEN => Ok(()),
            other => Err(ConfigError::UnsupportedTokenProvider(other.to_string())),
        }
    }

    fn fetch(&self, lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<String>, ConfigError> {
        self.check_supported()?;
        let value = match self.kind.as_str() {
            ENVIRONMENT_VARIABLE => self.value.as_deref().and_then(lookup),
            _ => self.value.clone(),
        };
        Ok(value.filter(|v| !v.is_empty()))
    }
}

impl TokenSpec {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<String, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup.
    ///
    /// A plain token is replaced by `CACHET_TOKEN` when that is set. A
    /// provider list is tried in order and the first non-empty value wins.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        match self {
            TokenSpec::Plain(token) => {
                if let Some(token) = lookup(TOKEN_ENV_VAR).filter(|t| !t.is_empty()) {
                    debug!("Using token from {}", TOKEN_ENV_VAR);
                    return Ok(token);
                }
                if token.is_empty() {
                    return Err(ConfigError::TokenNotFound);
                }
                Ok(token.clone())
            }
            TokenSpec::Providers(providers) => {
                for provider in providers {
                    if let Some(token) = provider.fetch(&lookup)? {
                        debug!(provider = %provider.kind, "Resolved token");
                        return Ok(token);
                    }
                }
                Err(ConfigError::TokenNotFound)
            }
        }
    }
}
