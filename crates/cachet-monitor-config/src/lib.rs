//! # Cachet Monitor Config
//!
//! YAML configuration for cachet-monitor: loading with `${VAR}` expansion,
//! validation, Cachet token resolution and conversion into the monitoring
//! engine's endpoint types.

mod error;
mod loader;
mod resolve;
mod schema;
mod token;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use resolve::ResolvedConfig;
pub use schema::*;
pub use token::{TokenProvider, TokenSpec};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
