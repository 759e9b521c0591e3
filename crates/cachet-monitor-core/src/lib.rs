//! # Cachet Monitor Core
//!
//! Per-endpoint monitoring engine.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler
//!   └── EndpointWorker (one tokio task per endpoint)
//!       ├── ProbeExecutor::probe()      → ProbeResult
//!       ├── Expectation::evaluate()     → Verdict (per expectation)
//!       ├── TickOutcome::aggregate()    → passed + severity
//!       ├── MonitorState::advance()     → Option<TransitionEvent>
//!       └── ActionDispatcher::dispatch()
//!           ├── StatusPageClient (incidents, component status, metrics)
//!           └── WebhookNotifier
//! ```
//!
//! Every worker owns its `MonitorState` exclusively. Nothing a worker does
//! (probe, evaluation or dispatch) can affect another worker's schedule.

pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod expectation;
pub mod latency;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod status_page;
pub mod telemetry;
pub mod template;
pub mod webhook;
pub mod worker;

pub use dispatcher::{ActionDispatcher, DEFAULT_CALL_TIMEOUT, DispatchCall, DispatchRecord};
pub use endpoint::{Action, EndpointConfig, MessageTemplates};
pub use error::{DispatchError, MonitorError};
pub use expectation::{Expectation, StatusRange, TickOutcome, Verdict};
pub use latency::LatencyUnit;
pub use probe::{ProbeExecutor, ProbeRequest, ProbeResponse, ProbeResult, TransportFailure, TransportFailureKind};
pub use scheduler::{Collaborators, Scheduler};
pub use state::{MonitorState, TransitionEvent, TransitionKind};
pub use status::{ComponentStatus, IncidentSeverity, IncidentStatus};
pub use status_page::{NewIncident, StatusPageClient};
pub use telemetry::{Counter, MonitorMetrics};
pub use webhook::{WebhookConfig, WebhookNotifier};
pub use worker::{EndpointSnapshot, EndpointWorker};
