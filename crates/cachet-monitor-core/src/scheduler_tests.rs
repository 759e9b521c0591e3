use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;
use crate::endpoint::Action;
use crate::error::DispatchError;
use crate::expectation::{Expectation, StatusRange};
use crate::probe::{ProbeRequest, ProbeResult};
use crate::status::ComponentStatus;
use crate::status_page::NewIncident;
use crate::telemetry::Counter;

/// Answers every probe with `status` after `delay`.
struct SlowProbe {
    status: u16,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowProbe {
    fn new(status: u16, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProbeExecutor for SlowProbe {
    async fn probe(&self, _request: &ProbeRequest) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        ProbeResult::response(self.status, "", self.delay)
    }
}

struct NullStatusPage;

#[async_trait]
impl StatusPageClient for NullStatusPage {
    async fn create_incident(&self, _incident: &NewIncident) -> Result<u64, DispatchError> {
        Ok(1)
    }

    async fn resolve_incident(&self, _incident_id: u64, _message: &str) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn update_component_status(
        &self,
        _component_id: u64,
        _status: ComponentStatus,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn push_metric(&self, _metric_id: u64, _value: f64, _timestamp: i64) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Never answers.
struct HangingStatusPage;

#[async_trait]
impl StatusPageClient for HangingStatusPage {
    async fn create_incident(&self, _incident: &NewIncident) -> Result<u64, DispatchError> {
        std::future::pending().await
    }

    async fn resolve_incident(&self, _incident_id: u64, _message: &str) -> Result<(), DispatchError> {
        std::future::pending().await
    }

    async fn update_component_status(
        &self,
        _component_id: u64,
        _status: ComponentStatus,
    ) -> Result<(), DispatchError> {
        std::future::pending().await
    }

    async fn push_metric(&self, _metric_id: u64, _value: f64, _timestamp: i64) -> Result<(), DispatchError> {
        std::future::pending().await
    }
}

struct NullNotifier;

#[async_trait]
impl WebhookNotifier for NullNotifier {
    async fn notify(&self, _url: &str, _params: &HashMap<String, String>) -> Result<(), DispatchError> {
        Ok(())
    }
}

fn collaborators(probe: Arc<dyn ProbeExecutor>) -> Collaborators {
    Collaborators {
        probe,
        status_page: Arc::new(NullStatusPage),
        notifier: Arc::new(NullNotifier),
        webhooks: Vec::new(),
        templates: MessageTemplates::default(),
        metrics: Arc::new(MonitorMetrics::new()),
        dispatch_timeout: Duration::from_secs(2),
    }
}

fn endpoint(name: &str, frequency: Duration, timeout: Duration) -> EndpointConfig {
    EndpointConfig::new(name, format!("http://{}.example.com", name), 1)
        .with_expectation(Expectation::http_status(StatusRange::single(200).unwrap(), None))
        .with_action(Action::UpdateStatus)
        .with_frequency(frequency)
        .with_timeout(timeout)
}

#[tokio::test]
async fn test_duplicate_names_rejected() {
    let probe = SlowProbe::new(200, Duration::ZERO);
    let endpoints = vec![
        endpoint("api", Duration::from_secs(10), Duration::from_secs(1)),
        endpoint("api", Duration::from_secs(10), Duration::from_secs(1)),
    ];
    let result = Scheduler::new(endpoints, collaborators(probe));
    assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_zero_frequency_rejected() {
    let probe = SlowProbe::new(200, Duration::ZERO);
    let endpoints = vec![endpoint("api", Duration::ZERO, Duration::from_secs(1))];
    let result = Scheduler::new(endpoints, collaborators(probe));
    assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_stop_without_start_returns_no_states() {
    let probe = SlowProbe::new(200, Duration::ZERO);
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(1))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    assert!(scheduler.stop().await.is_empty());
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_an_error() {
    let probe = SlowProbe::new(200, Duration::ZERO);
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(1))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    scheduler.start().unwrap();
    assert!(scheduler.is_running());
    assert!(matches!(scheduler.start(), Err(MonitorError::AlreadyRunning)));

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_frequency() {
    let probe = SlowProbe::new(200, Duration::ZERO);
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(1))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe.clone())).unwrap();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(35)).await;
    let states = scheduler.stop().await;

    // Ticks at 0s, 10s, 20s and 30s.
    assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    assert_eq!(scheduler.snapshots()[0].ticks, 4);
    assert_eq!(states["api"].status(), ComponentStatus::Operational);
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_track_state() {
    let probe = SlowProbe::new(500, Duration::ZERO);
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(1))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    let initial = scheduler.snapshots();
    assert_eq!(initial[0].status, ComponentStatus::Operational);
    assert_eq!(initial[0].ticks, 0);

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = &scheduler.snapshots()[0];
    assert_eq!(snapshot.name, "api");
    assert_eq!(snapshot.status, ComponentStatus::PartialOutage);
    assert_eq!(snapshot.consecutive_fail_count, 1);
    assert!(snapshot.last_transition_at.is_some());

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_tick() {
    let probe = SlowProbe::new(200, Duration::from_secs(3));
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(5))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let states = scheduler.stop().await;

    assert!(states.contains_key("api"));
    assert_eq!(scheduler.snapshots()[0].ticks, 1);
    assert_eq!(scheduler.snapshots()[0].last_latency, Some(Duration::from_secs(3)));
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_deadline_aborts_slow_workers() {
    let probe = SlowProbe::new(200, Duration::from_secs(100));
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(200))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let states = scheduler.stop_with_deadline(Duration::from_secs(2)).await;

    assert!(states.is_empty());
    assert_eq!(scheduler.snapshots()[0].ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_times_out() {
    let probe = SlowProbe::new(200, Duration::from_secs(60));
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(2))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe)).unwrap();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = &scheduler.snapshots()[0];
    assert_eq!(snapshot.ticks, 1);
    assert_eq!(snapshot.status, ComponentStatus::PartialOutage);
    assert!(snapshot.last_latency.is_none());

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_late_ticks_never_overlap() {
    let probe = SlowProbe::new(200, Duration::from_secs(15));
    let endpoints = vec![endpoint("api", Duration::from_secs(10), Duration::from_secs(20))];
    let mut scheduler = Scheduler::new(endpoints, collaborators(probe.clone())).unwrap();

    scheduler.start().unwrap();
    // Ticks start at 0s, 15s and 30s; each must finish before the next.
    tokio::time::sleep(Duration::from_secs(40)).await;
    scheduler.stop().await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.snapshots()[0].ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn test_hung_status_page_does_not_stall_ticks() {
    let probe = SlowProbe::new(500, Duration::ZERO);
    let endpoints = vec![
        endpoint("api", Duration::from_secs(10), Duration::from_secs(1)).with_action(Action::CreateIncident),
    ];
    let mut collaborators = collaborators(probe.clone());
    collaborators.status_page = Arc::new(HangingStatusPage);
    let metrics = collaborators.metrics.clone();
    let mut scheduler = Scheduler::new(endpoints, collaborators).unwrap();

    scheduler.start().unwrap();
    // Outage at 0s: create and status update each give up after 2s. Later
    // ticks at 10s..=50s carry no transition.
    tokio::time::sleep(Duration::from_secs(55)).await;
    let states = scheduler.stop().await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 6);
    assert_eq!(scheduler.snapshots()[0].ticks, 6);
    assert_eq!(metrics.get("api", Counter::DispatchFailures), 2);
    assert_eq!(states["api"].status(), ComponentStatus::PartialOutage);
    assert_eq!(states["api"].open_incident_id(), None);
}
