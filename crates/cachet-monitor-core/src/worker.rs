//! One endpoint's monitoring loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{ActionDispatcher, DispatchRecord};
use crate::endpoint::EndpointConfig;
use crate::expectation::TickOutcome;
use crate::probe::{ProbeExecutor, ProbeRequest, ProbeResult, TransportFailure};
use crate::state::MonitorState;
use crate::status::ComponentStatus;
use crate::telemetry::{Counter, MonitorMetrics};

/// Read-only view of a worker, published after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub name: String,
    pub status: ComponentStatus,
    pub consecutive_fail_count: u32,
    pub open_incident_id: Option<u64>,
    pub last_transition_at: Option<DateTime<Utc>>,
    pub ticks: u64,
    /// Latency of the last completed exchange.
    pub last_latency: Option<Duration>,
}

/// Owns an endpoint's [`MonitorState`] and drives it tick by tick.
pub struct EndpointWorker {
    endpoint: Arc<EndpointConfig>,
    probe: Arc<dyn ProbeExecutor>,
    dispatcher: Arc<ActionDispatcher>,
    metrics: Arc<MonitorMetrics>,
    state: MonitorState,
    ticks: u64,
    last_latency: Option<Duration>,
    snapshot_tx: watch::Sender<EndpointSnapshot>,
}

impl EndpointWorker {
    pub fn new(
        endpoint: Arc<EndpointConfig>,
        probe: Arc<dyn ProbeExecutor>,
        dispatcher: Arc<ActionDispatcher>,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        let state = MonitorState::new();
        let (snapshot_tx, _) = watch::channel(EndpointSnapshot {
            name: endpoint.name.clone(),
            status: state.status(),
            consecutive_fail_count: 0,
            open_incident_id: None,
            last_transition_at: None,
            ticks: 0,
            last_latency: None,
        });

        Self {
            endpoint,
            probe,
            dispatcher,
            metrics,
            state,
            ticks: 0,
            last_latency: None,
            snapshot_tx,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Receiver for the snapshots published after each tick.
    pub fn subscribe(&self) -> watch::Receiver<EndpointSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            name: self.endpoint.name.clone(),
            status: self.state.status(),
            consecutive_fail_count: self.state.consecutive_fail_count(),
            open_incident_id: self.state.open_incident_id(),
            last_transition_at: self.state.last_transition_at(),
            ticks: self.ticks,
            last_latency: self.last_latency,
        }
    }

    /// Run one probe-evaluate-advance-dispatch cycle.
    pub async fn tick(&mut self) -> Vec<DispatchRecord> {
        let request = ProbeRequest::for_endpoint(&self.endpoint);
        let result = match tokio::time::timeout(request.timeout, self.probe.probe(&request)).await {
            Ok(result) => result,
            Err(_) => ProbeResult::TransportFailure(TransportFailure::timeout(format!(
                "no response within {:?}",
                request.timeout
            ))),
        };

        if let ProbeResult::TransportFailure(failure) = &result {
            warn!(endpoint = %self.endpoint.name, kind = %failure.kind, detail = %failure.detail, "Probe failed");
        }

        let outcome = TickOutcome::evaluate(&self.endpoint.expectations, &result);
        let event = self.state.advance(&outcome, self.endpoint.allowed_fails);

        self.ticks += 1;
        if result.elapsed().is_some() {
            self.last_latency = result.elapsed();
        }
        self.metrics.inc(&self.endpoint.name, Counter::Ticks);
        if !outcome.passed {
            self.metrics.inc(&self.endpoint.name, Counter::FailedTicks);
        }

        debug!(
            endpoint = %self.endpoint.name,
            passed = outcome.passed,
            status = ?self.state.status(),
            fails = self.state.consecutive_fail_count(),
            "Tick evaluated"
        );

        if let Some(event) = &event {
            self.metrics.inc(&self.endpoint.name, Counter::Transitions);
            info!(
                endpoint = %self.endpoint.name,
                kind = %event.kind,
                from = %event.previous,
                to = %event.current,
                message = %event.message,
                "Status transition"
            );
        }

        let records = self
            .dispatcher
            .dispatch(&self.endpoint, &mut self.state, &result, event.as_ref())
            .await;

        self.snapshot_tx.send_replace(self.snapshot());
        records
    }

    /// Tick every `frequency` until `token` is cancelled, then hand back the
    /// final state.
    ///
    /// The first tick fires immediately. A tick in progress when the token is
    /// cancelled runs to completion.
    pub async fn run(mut self, token: CancellationToken) -> MonitorState {
        let mut interval = tokio::time::interval(self.endpoint.frequency);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(endpoint = %self.endpoint.name, frequency = ?self.endpoint.frequency, "Worker started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(endpoint = %self.endpoint.name, ticks = self.ticks, "Worker stopped");
        self.state
    }
}
