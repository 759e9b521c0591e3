//! `run` command: monitor until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cachet_monitor_client::{CachetClient, HttpProbe, WebhookClient};
use cachet_monitor_config::{ConfigLoader, ResolvedConfig};
use cachet_monitor_core::{Action, Collaborators, DEFAULT_CALL_TIMEOUT, EndpointConfig, MonitorMetrics, Scheduler};

use crate::server::{self, StatusState};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct RunOptions<'a> {
    pub config: &'a Path,
    pub status_addr: Option<SocketAddr>,
    pub shutdown_deadline: Option<Duration>,
}

pub(crate) async fn run(options: RunOptions<'_>) -> anyhow::Result<()> {
    let config = ConfigLoader::load(options.config)
        .with_context(|| format!("Failed to load {}", options.config.display()))?;
    let resolved = ResolvedConfig::from_config(&config)?;
    for warning in &resolved.warnings {
        warn!("Config: {}", warning);
    }

    let cachet = Arc::new(CachetClient::new(&resolved.api_url, resolved.token.clone())?);
    verify_endpoints(&cachet, &resolved.endpoints).await;

    let metrics = Arc::new(MonitorMetrics::new());
    let collaborators = Collaborators {
        probe: Arc::new(HttpProbe::new()?),
        status_page: cachet,
        notifier: Arc::new(WebhookClient::new(WEBHOOK_TIMEOUT)?),
        webhooks: resolved.webhooks,
        templates: resolved.messages,
        metrics: metrics.clone(),
        dispatch_timeout: DEFAULT_CALL_TIMEOUT,
    };

    let mut scheduler = Scheduler::new(resolved.endpoints, collaborators)?;
    scheduler.start()?;
    info!(api_url = %resolved.api_url, "Monitoring started");

    let server_token = CancellationToken::new();
    let server_task = options.status_addr.map(|addr| {
        let state = StatusState::new(scheduler.subscribe(), metrics.clone());
        let token = server_token.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(addr, state, token).await {
                error!(error = %e, "Status server failed");
            }
        })
    });

    wait_for_shutdown().await;
    info!("Shutdown signal received, stopping");

    let states = match options.shutdown_deadline {
        Some(deadline) => scheduler.stop_with_deadline(deadline).await,
        None => scheduler.stop().await,
    };
    for (name, state) in &states {
        info!(
            endpoint = %name,
            status = %state.status(),
            open_incident = ?state.open_incident_id(),
            "Final state"
        );
    }

    server_token.cancel();
    if let Some(task) = server_task {
        let _ = task.await;
    }

    info!("Goodbye");
    Ok(())
}

/// Check that every component and metric exists. Failures are logged only;
/// monitoring starts regardless.
async fn verify_endpoints(cachet: &CachetClient, endpoints: &[EndpointConfig]) {
    for endpoint in endpoints {
        match cachet.get_component_status(endpoint.component_id).await {
            Ok(status) => info!(
                endpoint = %endpoint.name,
                component_id = endpoint.component_id,
                %status,
                "Component found"
            ),
            Err(e) => warn!(
                endpoint = %endpoint.name,
                component_id = endpoint.component_id,
                error = %e,
                "Component lookup failed"
            ),
        }

        if let Some(metric_id) = endpoint.metric_id.filter(|_| endpoint.has_action(Action::PushMetrics)) {
            if let Err(e) = cachet.get_default_metric_value(metric_id).await {
                warn!(
                    endpoint = %endpoint.name,
                    metric_id,
                    error = %e,
                    "Metric lookup failed"
                );
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_endpoints_tolerates_unreachable_api() {
        let cachet = CachetClient::new("http://127.0.0.1:9/api/v1", "token").unwrap();
        let endpoints = vec![
            EndpointConfig::new("api", "https://api.example.com", 1)
                .with_action(Action::PushMetrics)
                .with_metric(2, Default::default()),
        ];

        // Connection refused is logged, not returned.
        verify_endpoints(&cachet, &endpoints).await;
    }
}
