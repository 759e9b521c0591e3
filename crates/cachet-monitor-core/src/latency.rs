//! Latency reporting units.

use std::str::FromStr;
use std::time::Duration;

use crate::error::MonitorError;

/// Unit a measured latency is reported in.
///
/// Probes always measure a `Duration`; the unit only affects the value
/// pushed to the metric endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl LatencyUnit {
    /// Convert a duration into this unit.
    pub fn convert(&self, elapsed: Duration) -> f64 {
        let seconds = elapsed.as_secs_f64();
        match self {
            LatencyUnit::Milliseconds => seconds * 1000.0,
            LatencyUnit::Seconds => seconds,
            LatencyUnit::Minutes => seconds / 60.0,
            LatencyUnit::Hours => seconds / 3600.0,
        }
    }

    /// Short name of the unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyUnit::Milliseconds => "ms",
            LatencyUnit::Seconds => "s",
            LatencyUnit::Minutes => "m",
            LatencyUnit::Hours => "h",
        }
    }
}

impl FromStr for LatencyUnit {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ms" | "milliseconds" => Ok(LatencyUnit::Milliseconds),
            "s" | "seconds" => Ok(LatencyUnit::Seconds),
            "m" | "minutes" => Ok(LatencyUnit::Minutes),
            "h" | "hours" => Ok(LatencyUnit::Hours),
            other => Err(MonitorError::InvalidConfig(format!(
                "unknown latency unit '{}', expected one of ms, s, m, h",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LatencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
