//! Status page collaborator.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DispatchError;
use crate::status::{ComponentStatus, IncidentStatus};

/// Incident to open on the status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIncident {
    pub name: String,
    pub message: String,
    pub status: IncidentStatus,
    pub visible: bool,
    pub component_id: u64,
    pub component_status: ComponentStatus,
}

/// Status page operations used by the dispatcher.
///
/// Implementations must be safe to share between endpoint workers.
#[async_trait]
pub trait StatusPageClient: Send + Sync {
    /// Open an incident and return its id.
    async fn create_incident(&self, incident: &NewIncident) -> Result<u64, DispatchError>;

    /// Mark an incident fixed with a closing message.
    async fn resolve_incident(&self, incident_id: u64, message: &str) -> Result<(), DispatchError>;

    /// Set a component's status.
    async fn update_component_status(
        &self,
        component_id: u64,
        status: ComponentStatus,
    ) -> Result<(), DispatchError>;

    /// Push one metric point. `timestamp` is Unix seconds.
    async fn push_metric(&self, metric_id: u64, value: f64, timestamp: i64) -> Result<(), DispatchError>;
}
