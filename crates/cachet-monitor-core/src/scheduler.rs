//! Runs one worker task per endpoint.
//!
//! Every worker gets a child of the scheduler's root [`CancellationToken`];
//! stopping the scheduler cancels the root and waits for each worker to hand
//! back its final state.

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::dispatcher::ActionDispatcher;
use crate::endpoint::{EndpointConfig, MessageTemplates};
use crate::error::MonitorError;
use crate::probe::ProbeExecutor;
use crate::state::MonitorState;
use crate::status_page::StatusPageClient;
use crate::telemetry::MonitorMetrics;
use crate::webhook::{WebhookConfig, WebhookNotifier};
use crate::worker::{EndpointSnapshot, EndpointWorker};

/// Shared services handed to every worker.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn ProbeExecutor>,
    pub status_page: Arc<dyn StatusPageClient>,
    pub notifier: Arc<dyn WebhookNotifier>,
    pub webhooks: Vec<WebhookConfig>,
    pub templates: MessageTemplates,
    pub metrics: Arc<MonitorMetrics>,
    /// Upper bound on each status page or webhook call.
    pub dispatch_timeout: Duration,
}

/// Endpoint scheduler.
///
/// A scheduler runs once: after [`stop`](Self::stop) the workers' states have
/// been handed back and it cannot be started again.
pub struct Scheduler {
    pending: Vec<EndpointWorker>,
    receivers: Vec<watch::Receiver<EndpointSnapshot>>,
    tasks: Vec<(String, JoinHandle<MonitorState>)>,
    root: CancellationToken,
    started: bool,
}

impl Scheduler {
    /// Build one worker per endpoint.
    ///
    /// Fails if two endpoints share a name or an endpoint has a zero
    /// frequency.
    pub fn new(endpoints: Vec<EndpointConfig>, collaborators: Collaborators) -> Result<Self, MonitorError> {
        let mut names = HashSet::new();
        for endpoint in &endpoints {
            if !names.insert(endpoint.name.as_str()) {
                return Err(MonitorError::InvalidConfig(format!(
                    "duplicate endpoint name '{}'",
                    endpoint.name
                )));
            }
            if endpoint.frequency.is_zero() {
                return Err(MonitorError::InvalidConfig(format!(
                    "endpoint '{}' has a zero frequency",
                    endpoint.name
                )));
            }
        }

        let dispatcher = Arc::new(
            ActionDispatcher::new(
                collaborators.status_page,
                collaborators.notifier,
                Arc::new(collaborators.webhooks),
                Arc::new(collaborators.templates),
                collaborators.metrics.clone(),
            )
            .with_call_timeout(collaborators.dispatch_timeout),
        );

        let pending: Vec<EndpointWorker> = endpoints
            .into_iter()
            .map(|endpoint| {
                EndpointWorker::new(
                    Arc::new(endpoint),
                    collaborators.probe.clone(),
                    dispatcher.clone(),
                    collaborators.metrics.clone(),
                )
            })
            .collect();
        let receivers = pending.iter().map(|w| w.subscribe()).collect();

        Ok(Self {
            pending,
            receivers,
            tasks: Vec::new(),
            root: CancellationToken::new(),
            started: false,
        })
    }

    /// Spawn every worker.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.started {
            return Err(MonitorError::AlreadyRunning);
        }
        self.started = true;

        for worker in self.pending.drain(..) {
            let name = worker.endpoint().name.clone();
            let token = self.root.child_token();
            let span = info_span!("endpoint", name = %name);
            let handle = tokio::spawn(worker.run(token).instrument(span));
            self.tasks.push((name, handle));
        }

        info!(endpoints = self.tasks.len(), "Scheduler started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.root.is_cancelled()
    }

    /// Token whose cancellation stops every worker.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Latest snapshot of every endpoint, in configuration order.
    pub fn snapshots(&self) -> Vec<EndpointSnapshot> {
        self.receivers.iter().map(|rx| rx.borrow().clone()).collect()
    }

    /// Snapshot receivers, for observers that outlive a borrow of the
    /// scheduler.
    pub fn subscribe(&self) -> Vec<watch::Receiver<EndpointSnapshot>> {
        self.receivers.clone()
    }

    /// Wait until every worker has exited, e.g. after the shutdown token was
    /// cancelled elsewhere.
    pub async fn wait(&mut self) -> HashMap<String, MonitorState> {
        let mut states = HashMap::new();
        for (name, handle) in self.tasks.drain(..) {
            match handle.await {
                Ok(state) => {
                    states.insert(name, state);
                }
                Err(e) => warn!(endpoint = %name, error = %e, "Worker task failed"),
            }
        }
        states
    }

    /// Cancel all timers and wait for in-flight ticks to finish.
    ///
    /// Returns the final state of every worker. A scheduler that was never
    /// started returns no states.
    pub async fn stop(&mut self) -> HashMap<String, MonitorState> {
        self.root.cancel();
        let states = self.wait().await;
        info!(endpoints = states.len(), "Scheduler stopped");
        states
    }

    /// Like [`stop`](Self::stop), but abort workers still running after
    /// `deadline`. Aborted workers return no state.
    pub async fn stop_with_deadline(&mut self, deadline: Duration) -> HashMap<String, MonitorState> {
        self.root.cancel();
        let deadline = tokio::time::Instant::now() + deadline;

        let mut states = HashMap::new();
        for (name, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(state)) => {
                    states.insert(name, state);
                }
                Ok(Err(e)) => warn!(endpoint = %name, error = %e, "Worker task failed"),
                Err(_) => {
                    handle.abort();
                    warn!(endpoint = %name, "Worker aborted at shutdown deadline");
                }
            }
        }

        info!(endpoints = states.len(), "Scheduler stopped");
        states
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
