//! HTTP probe executor.

use std::error::Error as _;
use std::time::Instant;

use async_trait::async_trait;
use cachet_monitor_core::{ProbeExecutor, ProbeRequest, ProbeResult, TransportFailure, TransportFailureKind};
use reqwest::{Client, Method};
use tracing::debug;

use crate::error::ClientError;

/// Probes endpoints over HTTP.
///
/// Holds two connection pools, one verifying TLS certificates and one that
/// accepts any certificate; each probe picks by its `tls_verify` flag.
#[derive(Clone)]
pub struct HttpProbe {
    verifying: Client,
    insecure: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, ClientError> {
        let verifying = Client::builder().build()?;
        let insecure = Client::builder().danger_accept_invalid_certs(true).build()?;
        Ok(Self { verifying, insecure })
    }

    fn client(&self, tls_verify: bool) -> &Client {
        if tls_verify { &self.verifying } else { &self.insecure }
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbe {
    async fn probe(&self, request: &ProbeRequest) -> ProbeResult {
        let method = match Method::from_bytes(request.method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return ProbeResult::TransportFailure(TransportFailure::new(
                    TransportFailureKind::Request,
                    format!("invalid HTTP method '{}'", request.method),
                ));
            }
        };

        let mut builder = self
            .client(request.tls_verify)
            .request(method, &request.url)
            .timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return ProbeResult::TransportFailure(classify(&e)),
        };
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ProbeResult::TransportFailure(classify(&e)),
        };
        let elapsed = started.elapsed();

        debug!(url = %request.url, status, elapsed = ?elapsed, "Probe completed");
        ProbeResult::response(status, body, elapsed)
    }
}

/// Map a reqwest error onto a transport failure kind.
fn classify(err: &reqwest::Error) -> TransportFailure {
    let detail = error_chain(err);
    if err.is_timeout() {
        TransportFailure::timeout(detail)
    } else if looks_like_tls(&detail) {
        TransportFailure::tls(detail)
    } else if err.is_connect() {
        TransportFailure::connection(detail)
    } else {
        TransportFailure::new(TransportFailureKind::Request, detail)
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

fn looks_like_tls(detail: &str) -> bool {
    let detail = detail.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| detail.contains(needle))
}
