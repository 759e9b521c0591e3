//! Per-endpoint counters exported in Prometheus text format.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Counter kinds tracked for every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Ticks,
    FailedTicks,
    Transitions,
    IncidentsOpened,
    DispatchFailures,
}

impl Counter {
    const ALL: [Counter; 5] = [
        Counter::Ticks,
        Counter::FailedTicks,
        Counter::Transitions,
        Counter::IncidentsOpened,
        Counter::DispatchFailures,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Counter::Ticks => "cachet_monitor_ticks_total",
            Counter::FailedTicks => "cachet_monitor_failed_ticks_total",
            Counter::Transitions => "cachet_monitor_transitions_total",
            Counter::IncidentsOpened => "cachet_monitor_incidents_opened_total",
            Counter::DispatchFailures => "cachet_monitor_dispatch_failures_total",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Counter::Ticks => "Probe ticks executed",
            Counter::FailedTicks => "Ticks whose expectations failed",
            Counter::Transitions => "Status transitions",
            Counter::IncidentsOpened => "Incidents opened on the status page",
            Counter::DispatchFailures => "Failed status page or webhook calls",
        }
    }

    fn index(&self) -> usize {
        match self {
            Counter::Ticks => 0,
            Counter::FailedTicks => 1,
            Counter::Transitions => 2,
            Counter::IncidentsOpened => 3,
            Counter::DispatchFailures => 4,
        }
    }
}

#[derive(Default)]
struct EndpointCounters {
    values: [AtomicU64; 5],
}

/// Shared telemetry. Safe to update from every worker concurrently.
#[derive(Default)]
pub struct MonitorMetrics {
    endpoints: DashMap<String, EndpointCounters>,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `counter` for `endpoint`.
    pub fn inc(&self, endpoint: &str, counter: Counter) {
        self.add(endpoint, counter, 1);
    }

    pub fn add(&self, endpoint: &str, counter: Counter, value: u64) {
        if let Some(entry) = self.endpoints.get(endpoint) {
            entry.values[counter.index()].fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.endpoints
            .entry(endpoint.to_string())
            .or_default()
            .values[counter.index()]
            .fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self, endpoint: &str, counter: Counter) -> u64 {
        self.endpoints
            .get(endpoint)
            .map(|entry| entry.values[counter.index()].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Export all counters in Prometheus format, endpoints sorted by name.
    pub fn export(&self) -> String {
        let mut names: Vec<String> = self.endpoints.iter().map(|e| e.key().clone()).collect();
        names.sort();

        let mut output = String::new();
        for counter in Counter::ALL {
            let _ = writeln!(output, "# HELP {} {}", counter.name(), counter.help());
            let _ = writeln!(output, "# TYPE {} counter", counter.name());
            for name in &names {
                let _ = writeln!(
                    output,
                    "{}{{endpoint=\"{}\"}} {}",
                    counter.name(),
                    escape_label(name),
                    self.get(name, counter)
                );
            }
        }
        output
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
