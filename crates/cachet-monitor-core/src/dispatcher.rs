//! Turns ticks and transitions into status page and webhook calls.
//!
//! Every call is fire-and-forget relative to the state machine: failures are
//! logged and counted, and the state is never rolled back. Each call is
//! bounded by the dispatcher's call timeout so a hung status page cannot
//! stall the endpoint's ticks.

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::endpoint::{Action, EndpointConfig, MessageTemplates};
use crate::error::DispatchError;
use crate::probe::ProbeResult;
use crate::state::{MonitorState, TransitionEvent, TransitionKind};
use crate::status::{ComponentStatus, IncidentStatus};
use crate::status_page::{NewIncident, StatusPageClient};
use crate::telemetry::{Counter, MonitorMetrics};
use crate::webhook::{WebhookConfig, WebhookNotifier};

/// An external call issued by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchCall {
    CreateIncident {
        component_id: u64,
        status: ComponentStatus,
    },
    ResolveIncident {
        incident_id: u64,
    },
    UpdateStatus {
        component_id: u64,
        status: ComponentStatus,
    },
    PushMetric {
        metric_id: u64,
        value: f64,
    },
    Webhook {
        url: String,
    },
}

/// A call and its outcome.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub call: DispatchCall,
    pub result: Result<(), DispatchError>,
}

impl DispatchRecord {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Default upper bound on a single status page or webhook call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes the configured actions of an endpoint.
pub struct ActionDispatcher {
    status_page: Arc<dyn StatusPageClient>,
    notifier: Arc<dyn WebhookNotifier>,
    webhooks: Arc<Vec<WebhookConfig>>,
    templates: Arc<MessageTemplates>,
    metrics: Arc<MonitorMetrics>,
    call_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(
        status_page: Arc<dyn StatusPageClient>,
        notifier: Arc<dyn WebhookNotifier>,
        webhooks: Arc<Vec<WebhookConfig>>,
        templates: Arc<MessageTemplates>,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            status_page,
            notifier,
            webhooks,
            templates,
            metrics,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound every external call by `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, DispatchError>>) -> Result<T, DispatchError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::TimedOut(self.call_timeout)),
        }
    }

    /// Issue the calls for one tick.
    ///
    /// Call order is fixed: incident handling, component status, metric
    /// point, then webhooks.
    pub async fn dispatch(
        &self,
        endpoint: &EndpointConfig,
        state: &mut MonitorState,
        result: &ProbeResult,
        event: Option<&TransitionEvent>,
    ) -> Vec<DispatchRecord> {
        self.dispatch_at(endpoint, state, result, event, Utc::now()).await
    }

    /// [`dispatch`](Self::dispatch) with an explicit tick timestamp.
    pub async fn dispatch_at(
        &self,
        endpoint: &EndpointConfig,
        state: &mut MonitorState,
        result: &ProbeResult,
        event: Option<&TransitionEvent>,
        now: DateTime<Utc>,
    ) -> Vec<DispatchRecord> {
        let mut records = Vec::new();

        if let Some(event) = event {
            if endpoint.has_action(Action::CreateIncident) {
                self.handle_incident(endpoint, state, event, &mut records).await;
            }

            if endpoint.has_action(Action::UpdateStatus) {
                let call = DispatchCall::UpdateStatus {
                    component_id: endpoint.component_id,
                    status: event.current,
                };
                let outcome = self
                    .bounded(self.status_page.update_component_status(endpoint.component_id, event.current))
                    .await;
                self.record(endpoint, call, outcome, &mut records);
            }
        }

        if endpoint.has_action(Action::PushMetrics) {
            if let (Some(metric_id), Some(elapsed)) = (endpoint.metric_id, result.elapsed()) {
                let value = endpoint.latency_unit.convert(elapsed);
                let call = DispatchCall::PushMetric { metric_id, value };
                let outcome = self
                    .bounded(self.status_page.push_metric(metric_id, value, now.timestamp()))
                    .await;
                self.record(endpoint, call, outcome, &mut records);
            }
        }

        if let Some(event) = event {
            let title = self.templates.title_for(event.current, &endpoint.name);
            for webhook in self.webhooks.iter() {
                let (url, params) = webhook.render(&title, &event.message);
                let call = DispatchCall::Webhook { url: url.clone() };
                let outcome = self.bounded(self.notifier.notify(&url, &params)).await;
                self.record(endpoint, call, outcome, &mut records);
            }
        }

        records
    }

    async fn handle_incident(
        &self,
        endpoint: &EndpointConfig,
        state: &mut MonitorState,
        event: &TransitionEvent,
        records: &mut Vec<DispatchRecord>,
    ) {
        match event.kind {
            TransitionKind::OutageStart | TransitionKind::OutageEscalate => {
                // Escalation only opens an incident when the one for this
                // episode was never created.
                if state.open_incident_id().is_some() {
                    return;
                }

                let incident = NewIncident {
                    name: self.templates.title_for(event.current, &endpoint.name),
                    message: event.message.clone(),
                    status: IncidentStatus::Investigating,
                    visible: endpoint.public_incidents,
                    component_id: endpoint.component_id,
                    component_status: event.current,
                };
                let call = DispatchCall::CreateIncident {
                    component_id: endpoint.component_id,
                    status: event.current,
                };

                let outcome = match self.bounded(self.status_page.create_incident(&incident)).await {
                    Ok(id) => {
                        state.set_open_incident(id);
                        self.metrics.inc(&endpoint.name, Counter::IncidentsOpened);
                        info!(endpoint = %endpoint.name, incident_id = id, "Incident opened");
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                self.record(endpoint, call, outcome, records);
            }
            TransitionKind::Recovery => {
                // Cleared before the call: the episode is over either way.
                let Some(incident_id) = state.take_open_incident() else {
                    debug!(endpoint = %endpoint.name, "Recovered without an open incident");
                    return;
                };

                let message = self
                    .templates
                    .title_for(ComponentStatus::Operational, &endpoint.name);
                let outcome = self
                    .bounded(self.status_page.resolve_incident(incident_id, &message))
                    .await;
                if outcome.is_ok() {
                    info!(endpoint = %endpoint.name, incident_id, "Incident resolved");
                }
                self.record(endpoint, DispatchCall::ResolveIncident { incident_id }, outcome, records);
            }
        }
    }

    fn record(
        &self,
        endpoint: &EndpointConfig,
        call: DispatchCall,
        result: Result<(), DispatchError>,
        records: &mut Vec<DispatchRecord>,
    ) {
        if let Err(e) = &result {
            warn!(endpoint = %endpoint.name, call = ?call, error = %e, "Dispatch failed");
            self.metrics.inc(&endpoint.name, Counter::DispatchFailures);
        }
        records.push(DispatchRecord { call, result });
    }
}
