//! Monitor errors.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building or running the monitoring engine.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// An expectation could not be built from its configuration.
    ///
    /// Raised at load time, before any endpoint is scheduled.
    #[error("Invalid expectation: {0}")]
    InvalidExpectation(String),

    /// Invalid endpoint configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scheduler was started twice.
    #[error("Scheduler is already running")]
    AlreadyRunning,
}

/// Failure delivering a call to the status page or a webhook.
///
/// These are reported and counted, never propagated into the state machine.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The request could not be sent or no response was received.
    #[error("Request failed: {0}")]
    Request(String),

    /// The remote side answered with a non-success status.
    #[error("Unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not complete within the dispatcher's time limit.
    #[error("No response within {0:?}")]
    TimedOut(Duration),
}
