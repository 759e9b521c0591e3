use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::expectation::TickOutcome;
use crate::latency::LatencyUnit;
use crate::status::IncidentSeverity;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(NewIncident),
    Resolve(u64, String),
    Status(u64, ComponentStatus),
    Metric(u64, f64, i64),
}

#[derive(Default)]
struct FakeStatusPage {
    calls: Mutex<Vec<Call>>,
    fail: AtomicBool,
}

impl FakeStatusPage {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn outcome(&self) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(DispatchError::Request("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatusPageClient for FakeStatusPage {
    async fn create_incident(&self, incident: &NewIncident) -> Result<u64, DispatchError> {
        self.calls.lock().push(Call::Create(incident.clone()));
        self.outcome().map(|_| 42)
    }

    async fn resolve_incident(&self, incident_id: u64, message: &str) -> Result<(), DispatchError> {
        self.calls
            .lock()
            .push(Call::Resolve(incident_id, message.to_string()));
        self.outcome()
    }

    async fn update_component_status(
        &self,
        component_id: u64,
        status: ComponentStatus,
    ) -> Result<(), DispatchError> {
        self.calls.lock().push(Call::Status(component_id, status));
        self.outcome()
    }

    async fn push_metric(&self, metric_id: u64, value: f64, timestamp: i64) -> Result<(), DispatchError> {
        self.calls.lock().push(Call::Metric(metric_id, value, timestamp));
        self.outcome()
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(String, HashMap<String, String>)>>,
}

#[async_trait]
impl WebhookNotifier for FakeNotifier {
    async fn notify(&self, url: &str, params: &HashMap<String, String>) -> Result<(), DispatchError> {
        self.sent.lock().push((url.to_string(), params.clone()));
        Ok(())
    }
}

struct Harness {
    status_page: Arc<FakeStatusPage>,
    notifier: Arc<FakeNotifier>,
    metrics: Arc<MonitorMetrics>,
    dispatcher: ActionDispatcher,
}

fn harness(webhooks: Vec<WebhookConfig>) -> Harness {
    let status_page = Arc::new(FakeStatusPage::default());
    let notifier = Arc::new(FakeNotifier::default());
    let metrics = Arc::new(MonitorMetrics::new());
    let dispatcher = ActionDispatcher::new(
        status_page.clone(),
        notifier.clone(),
        Arc::new(webhooks),
        Arc::new(MessageTemplates::default()),
        metrics.clone(),
    );
    Harness {
        status_page,
        notifier,
        metrics,
        dispatcher,
    }
}

fn endpoint() -> EndpointConfig {
    EndpointConfig::new("Google", "http://www.google.com", 1)
        .with_action(Action::CreateIncident)
        .with_action(Action::UpdateStatus)
}

fn ok_result() -> ProbeResult {
    ProbeResult::response(200, "ok", Duration::from_millis(1500))
}

fn outage(state: &mut MonitorState, severity: IncidentSeverity) -> TransitionEvent {
    state
        .advance(&TickOutcome::failed(severity, "Unexpected HTTP status (500)"), 0)
        .unwrap()
}

fn recovery(state: &mut MonitorState) -> TransitionEvent {
    state.advance(&TickOutcome::passed(), 0).unwrap()
}

#[tokio::test]
async fn test_outage_start_creates_incident_and_updates_status() {
    let h = harness(vec![]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Partial);

    let records = h
        .dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_success()));
    assert_eq!(
        h.status_page.calls(),
        vec![
            Call::Create(NewIncident {
                name: "Google is unavailable".to_string(),
                message: "Unexpected HTTP status (500)".to_string(),
                status: IncidentStatus::Investigating,
                visible: true,
                component_id: 1,
                component_status: ComponentStatus::PartialOutage,
            }),
            Call::Status(1, ComponentStatus::PartialOutage),
        ]
    );
    assert_eq!(state.open_incident_id(), Some(42));
    assert_eq!(h.metrics.get("Google", Counter::IncidentsOpened), 1);
}

#[tokio::test]
async fn test_performance_incident_uses_performance_title() {
    let h = harness(vec![]);
    let mut endpoint = endpoint();
    endpoint.public_incidents = false;
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Performance);

    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    match &h.status_page.calls()[0] {
        Call::Create(incident) => {
            assert_eq!(incident.name, "Google has degraded performance");
            assert!(!incident.visible);
            assert_eq!(incident.component_status, ComponentStatus::PerformanceIssues);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn test_no_event_no_status_calls() {
    let h = harness(vec![WebhookConfig::new("https://hooks.example.com")]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();

    let records = h
        .dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), None)
        .await;

    assert!(records.is_empty());
    assert!(h.status_page.calls().is_empty());
    assert!(h.notifier.sent.lock().is_empty());
}

#[tokio::test]
async fn test_recovery_resolves_open_incident() {
    let h = harness(vec![]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Major);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    let event = recovery(&mut state);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    let calls = h.status_page.calls();
    assert_eq!(
        &calls[2..],
        &[
            Call::Resolve(42, "Google is operational".to_string()),
            Call::Status(1, ComponentStatus::Operational),
        ]
    );
    assert!(state.open_incident_id().is_none());
}

#[tokio::test]
async fn test_recovery_without_incident_skips_resolve() {
    let h = harness(vec![]);
    let endpoint = EndpointConfig::new("Google", "http://www.google.com", 1)
        .with_action(Action::CreateIncident);
    let mut state = MonitorState::new();
    outage(&mut state, IncidentSeverity::Partial);

    let event = recovery(&mut state);
    let records = h
        .dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    assert!(records.is_empty());
    assert!(h.status_page.calls().is_empty());
}

#[tokio::test]
async fn test_failed_resolve_still_clears_incident() {
    let h = harness(vec![]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Partial);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    h.status_page.fail.store(true, Ordering::SeqCst);
    let event = recovery(&mut state);
    let records = h
        .dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.is_success()));
    assert!(state.open_incident_id().is_none());
    assert_eq!(state.status(), ComponentStatus::Operational);
    assert_eq!(h.metrics.get("Google", Counter::DispatchFailures), 2);
}

#[tokio::test]
async fn test_escalation_retries_failed_create() {
    let h = harness(vec![]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();

    h.status_page.fail.store(true, Ordering::SeqCst);
    let event = outage(&mut state, IncidentSeverity::Partial);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;
    assert!(state.open_incident_id().is_none());

    h.status_page.fail.store(false, Ordering::SeqCst);
    let event = outage(&mut state, IncidentSeverity::Major);
    assert_eq!(event.kind, TransitionKind::OutageEscalate);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    assert_eq!(state.open_incident_id(), Some(42));
}

#[tokio::test]
async fn test_escalation_keeps_existing_incident() {
    let h = harness(vec![]);
    let endpoint = endpoint();
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Partial);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    let event = outage(&mut state, IncidentSeverity::Major);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    let creates = h
        .status_page
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Create(_)))
        .count();
    assert_eq!(creates, 1);
    assert_eq!(
        h.status_page.calls().last(),
        Some(&Call::Status(1, ComponentStatus::MajorOutage))
    );
}

#[tokio::test]
async fn test_push_metric_converts_latency() {
    let h = harness(vec![]);
    let endpoint = EndpointConfig::new("Google", "http://www.google.com", 1)
        .with_action(Action::PushMetrics)
        .with_metric(9, LatencyUnit::Seconds);
    let mut state = MonitorState::new();
    let now = Utc::now();

    h.dispatcher
        .dispatch_at(&endpoint, &mut state, &ok_result(), None, now)
        .await;

    assert_eq!(h.status_page.calls(), vec![Call::Metric(9, 1.5, now.timestamp())]);
}

#[tokio::test]
async fn test_push_metric_requires_metric_id() {
    let h = harness(vec![]);
    let endpoint =
        EndpointConfig::new("Google", "http://www.google.com", 1).with_action(Action::PushMetrics);
    let mut state = MonitorState::new();

    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), None)
        .await;

    assert!(h.status_page.calls().is_empty());
}

#[tokio::test]
async fn test_transport_failure_pushes_no_metric() {
    let h = harness(vec![]);
    let endpoint = EndpointConfig::new("Google", "http://www.google.com", 1)
        .with_action(Action::PushMetrics)
        .with_metric(9, LatencyUnit::Milliseconds);
    let mut state = MonitorState::new();
    let result = ProbeResult::TransportFailure(crate::probe::TransportFailure::timeout("1s"));

    h.dispatcher
        .dispatch(&endpoint, &mut state, &result, None)
        .await;

    assert!(h.status_page.calls().is_empty());
}

#[tokio::test]
async fn test_webhooks_fire_on_transitions() {
    let webhook = WebhookConfig::new("https://push.example.com/message")
        .with_param("title", "{title}")
        .with_param("message", "{message}");
    let h = harness(vec![webhook]);
    let endpoint = EndpointConfig::new("Google", "http://www.google.com", 1);
    let mut state = MonitorState::new();

    let event = outage(&mut state, IncidentSeverity::Major);
    let records = h
        .dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].call,
        DispatchCall::Webhook {
            url: "https://push.example.com/message".to_string()
        }
    );

    let event = recovery(&mut state);
    h.dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    let sent = h.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1["title"], "Google is unavailable");
    assert_eq!(sent[0].1["message"], "Unexpected HTTP status (500)");
    assert_eq!(sent[1].1["title"], "Google is operational");
    assert_eq!(sent[1].1["message"], "Google is operational");
}

struct HangingNotifier;

#[async_trait]
impl WebhookNotifier for HangingNotifier {
    async fn notify(&self, _url: &str, _params: &HashMap<String, String>) -> Result<(), DispatchError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_webhook_times_out() {
    let status_page = Arc::new(FakeStatusPage::default());
    let metrics = Arc::new(MonitorMetrics::new());
    let dispatcher = ActionDispatcher::new(
        status_page.clone(),
        Arc::new(HangingNotifier),
        Arc::new(vec![WebhookConfig::new("http://hooks.example.com/notify")]),
        Arc::new(MessageTemplates::default()),
        metrics.clone(),
    )
    .with_call_timeout(Duration::from_secs(3));

    let endpoint = endpoint();
    let mut state = MonitorState::new();
    let event = outage(&mut state, IncidentSeverity::Partial);

    let started = tokio::time::Instant::now();
    let records = dispatcher
        .dispatch(&endpoint, &mut state, &ok_result(), Some(&event))
        .await;

    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(records.len(), 3);
    assert!(records[0].is_success());
    assert!(records[1].is_success());
    assert!(matches!(
        records[2].result,
        Err(DispatchError::TimedOut(timeout)) if timeout == Duration::from_secs(3)
    ));
    assert_eq!(status_page.calls().len(), 2);
    assert_eq!(state.open_incident_id(), Some(42));
    assert_eq!(metrics.get("Google", Counter::DispatchFailures), 1);
}
