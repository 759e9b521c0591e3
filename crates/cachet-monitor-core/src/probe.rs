//! Probe request/result types and the probe executor seam.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::endpoint::EndpointConfig;

/// Everything needed to issue one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub tls_verify: bool,
    pub timeout: Duration,
}

impl ProbeRequest {
    /// Build the probe request for an endpoint.
    pub fn for_endpoint(endpoint: &EndpointConfig) -> Self {
        Self {
            url: endpoint.url.clone(),
            method: endpoint.method.clone(),
            headers: endpoint.headers.clone(),
            tls_verify: endpoint.tls_verify,
            timeout: endpoint.timeout,
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    /// End-to-end time of the request, including reading the body.
    pub elapsed: Duration,
}

/// Why a probe produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    Timeout,
    Connection,
    Tls,
    /// Any other request error (malformed URL, protocol error, body decode).
    Request,
}

impl std::fmt::Display for TransportFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailureKind::Timeout => write!(f, "timeout"),
            TransportFailureKind::Connection => write!(f, "connection"),
            TransportFailureKind::Tls => write!(f, "tls"),
            TransportFailureKind::Request => write!(f, "request"),
        }
    }
}

/// A probe that never got a usable response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub detail: String,
}

impl TransportFailure {
    pub fn new(kind: TransportFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Timeout, detail)
    }

    pub fn connection(detail: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Connection, detail)
    }

    pub fn tls(detail: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Tls, detail)
    }
}

/// Outcome of one network attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Response(ProbeResponse),
    TransportFailure(TransportFailure),
}

impl ProbeResult {
    /// Convenience constructor for a completed exchange.
    pub fn response(status: u16, body: impl Into<String>, elapsed: Duration) -> Self {
        ProbeResult::Response(ProbeResponse {
            status,
            body: body.into(),
            elapsed,
        })
    }

    /// Measured latency, when an exchange completed.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ProbeResult::Response(response) => Some(response.elapsed),
            ProbeResult::TransportFailure(_) => None,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ProbeResult::TransportFailure(_))
    }
}

/// Issues probes on behalf of endpoint workers.
///
/// Implementations are shared by every worker and must be safe for
/// concurrent use. A probe never fails with an error: anything that
/// prevents a response is reported as [`ProbeResult::TransportFailure`].
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> ProbeResult;
}
