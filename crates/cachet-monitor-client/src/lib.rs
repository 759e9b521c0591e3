//! # Cachet Monitor Client
//!
//! reqwest-based implementations of the monitoring engine's collaborator
//! traits:
//!
//! - [`HttpProbe`] issues endpoint probes ([`ProbeExecutor`](cachet_monitor_core::ProbeExecutor))
//! - [`CachetClient`] talks to the Cachet API ([`StatusPageClient`](cachet_monitor_core::StatusPageClient))
//! - [`WebhookClient`] delivers webhooks ([`WebhookNotifier`](cachet_monitor_core::WebhookNotifier))

mod cachet;
mod error;
mod probe;
mod webhook;

pub use cachet::{CachetClient, Component, DEFAULT_REQUEST_TIMEOUT, normalize_url};
pub use error::ClientError;
pub use probe::HttpProbe;
pub use webhook::WebhookClient;
