//! Client errors.

use cachet_monitor_core::DispatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Component {0} does not exist")]
    ComponentNotFound(u64),

    #[error("Metric {0} does not exist")]
    MetricNotFound(u64),
}

impl From<ClientError> for DispatchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) => DispatchError::Request(e.to_string()),
            ClientError::UnexpectedStatus { status, body } => DispatchError::Status { status, body },
            other => DispatchError::InvalidResponse(other.to_string()),
        }
    }
}
