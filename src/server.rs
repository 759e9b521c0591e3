//! Status HTTP server: `/health` and `/metrics`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cachet_monitor_core::{ComponentStatus, EndpointSnapshot, MonitorMetrics};

/// Health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl From<ComponentStatus> for HealthStatus {
    fn from(status: ComponentStatus) -> Self {
        match status {
            ComponentStatus::Operational => HealthStatus::Healthy,
            ComponentStatus::MajorOutage => HealthStatus::Unhealthy,
            ComponentStatus::PerformanceIssues
            | ComponentStatus::PartialOutage
            | ComponentStatus::Unknown => HealthStatus::Degraded,
        }
    }
}

/// Health of one endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct EndpointHealth {
    pub health: HealthStatus,
    #[serde(flatten)]
    pub snapshot: EndpointSnapshot,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub endpoints: HashMap<String, EndpointHealth>,
}

/// State shared by the handlers.
#[derive(Clone)]
pub(crate) struct StatusState {
    snapshots: Arc<Vec<watch::Receiver<EndpointSnapshot>>>,
    metrics: Arc<MonitorMetrics>,
    started_at: Instant,
}

impl StatusState {
    pub fn new(snapshots: Vec<watch::Receiver<EndpointSnapshot>>, metrics: Arc<MonitorMetrics>) -> Self {
        Self {
            snapshots: Arc::new(snapshots),
            metrics,
            started_at: Instant::now(),
        }
    }

    /// Worst endpoint health wins; no endpoints means healthy.
    fn health(&self) -> HealthResponse {
        let mut overall = HealthStatus::Healthy;
        let mut endpoints = HashMap::new();

        for receiver in self.snapshots.iter() {
            let snapshot = receiver.borrow().clone();
            let status = HealthStatus::from(snapshot.status);
            overall = match (overall, status) {
                (_, HealthStatus::Unhealthy) | (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
                (_, HealthStatus::Degraded) | (HealthStatus::Degraded, _) => HealthStatus::Degraded,
                _ => HealthStatus::Healthy,
            };
            endpoints.insert(snapshot.name.clone(), EndpointHealth { health: status, snapshot });
        }

        HealthResponse {
            status: overall,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            endpoints,
        }
    }
}

pub(crate) fn router(state: StatusState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_handler))
        .route("/metrics", axum::routing::get(metrics_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<StatusState>) -> impl IntoResponse {
    let response = state.health();
    let code = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (code, Json(response))
}

async fn metrics_handler(State(state): State<StatusState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        state.metrics.export(),
    )
}

/// Serve until `token` is cancelled.
pub(crate) async fn serve(addr: SocketAddr, state: StatusState, token: CancellationToken) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Status server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cachet_monitor_core::Counter;
    use tower::ServiceExt;

    fn snapshot(name: &str, status: ComponentStatus) -> EndpointSnapshot {
        EndpointSnapshot {
            name: name.to_string(),
            status,
            consecutive_fail_count: 0,
            open_incident_id: None,
            last_transition_at: None,
            ticks: 3,
            last_latency: None,
        }
    }

    fn state_with(statuses: &[(&str, ComponentStatus)]) -> (StatusState, Vec<watch::Sender<EndpointSnapshot>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = statuses
            .iter()
            .map(|(name, status)| watch::channel(snapshot(name, *status)))
            .unzip();
        (StatusState::new(receivers, Arc::new(MonitorMetrics::new())), senders)
    }

    async fn get(state: StatusState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_health_status_from_component_status() {
        assert_eq!(HealthStatus::from(ComponentStatus::Operational), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from(ComponentStatus::PerformanceIssues), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from(ComponentStatus::PartialOutage), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from(ComponentStatus::MajorOutage), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_all_operational() {
        let (state, _senders) = state_with(&[("api", ComponentStatus::Operational), ("web", ComponentStatus::Operational)]);

        let (code, body) = get(state, "/health").await;
        assert_eq!(code, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["endpoints"]["api"]["health"], "healthy");
        assert_eq!(json["endpoints"]["api"]["status"], "operational");
        assert_eq!(json["endpoints"]["api"]["ticks"], 3);
    }

    #[tokio::test]
    async fn test_health_degraded() {
        let (state, _senders) = state_with(&[("api", ComponentStatus::Operational), ("web", ComponentStatus::PartialOutage)]);

        let (code, body) = get(state, "/health").await;
        assert_eq!(code, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["endpoints"]["web"]["health"], "degraded");
    }

    #[tokio::test]
    async fn test_health_major_outage_is_503() {
        let (state, senders) = state_with(&[("api", ComponentStatus::Operational), ("web", ComponentStatus::PartialOutage)]);
        senders[0].send_replace(snapshot("api", ComponentStatus::MajorOutage));

        let (code, body) = get(state, "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["endpoints"]["api"]["health"], "unhealthy");
    }

    #[tokio::test]
    async fn test_metrics_export() {
        let metrics = Arc::new(MonitorMetrics::new());
        metrics.add("api", Counter::Ticks, 4);
        let state = StatusState::new(Vec::new(), metrics);

        let (code, body) = get(state, "/metrics").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("cachet_monitor_ticks_total{endpoint=\"api\"} 4"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (state, _senders) = state_with(&[]);
        let (code, _) = get(state, "/nope").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }
}
