//! Expectation evaluation.
//!
//! An expectation judges a single [`ProbeResult`]. The verdicts of one tick
//! are folded into a [`TickOutcome`] which drives the state machine.

#[cfg(test)]
#[path = "expectation_tests.rs"]
mod tests;

use std::str::FromStr;
use std::time::Duration;

use regex::{Regex, RegexBuilder};

use crate::error::MonitorError;
use crate::probe::{ProbeResult, TransportFailure, TransportFailureKind};
use crate::status::IncidentSeverity;

/// Accepted HTTP status codes, `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    lower: u16,
    upper: u16,
}

impl StatusRange {
    /// Build a range; `lower` must be strictly below `upper`.
    pub fn new(lower: u16, upper: u16) -> Result<Self, MonitorError> {
        if lower >= upper {
            return Err(MonitorError::InvalidExpectation(format!(
                "status range [{}, {}) is empty",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// A single accepted status, `[code, code + 1)`.
    ///
    /// Fails for 65535, whose range would be empty.
    pub fn single(code: u16) -> Result<Self, MonitorError> {
        Self::new(code, code.saturating_add(1))
    }

    pub fn lower(&self) -> u16 {
        self.lower
    }

    pub fn upper(&self) -> u16 {
        self.upper
    }

    pub fn contains(&self, status: u16) -> bool {
        self.lower <= status && status < self.upper
    }
}

impl FromStr for StatusRange {
    type Err = MonitorError;

    /// Parses `"200"` or `"200-300"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<u16>().map_err(|_| {
                MonitorError::InvalidExpectation(format!("invalid status range '{}'", s))
            })
        };

        match s.split_once('-') {
            None => Self::single(parse(s)?),
            Some((lower, upper)) => Self::new(parse(lower)?, parse(upper)?),
        }
    }
}

impl std::fmt::Display for StatusRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}[", self.lower, self.upper)
    }
}

/// A declarative check applied to every probe result.
#[derive(Debug, Clone)]
pub enum Expectation {
    HttpStatus {
        range: StatusRange,
        severity: IncidentSeverity,
    },
    Latency {
        threshold: Duration,
        severity: IncidentSeverity,
    },
    Regex {
        pattern: String,
        regex: Regex,
        /// Accepted for configuration compatibility; not used in evaluation.
        threshold: Option<f64>,
        severity: IncidentSeverity,
    },
}

impl Expectation {
    /// Status code expectation, `PARTIAL` unless overridden.
    pub fn http_status(range: StatusRange, severity: Option<IncidentSeverity>) -> Self {
        Expectation::HttpStatus {
            range,
            severity: severity.unwrap_or(IncidentSeverity::Partial),
        }
    }

    /// Latency expectation, `PERFORMANCE` unless overridden.
    pub fn latency(threshold: Duration, severity: Option<IncidentSeverity>) -> Self {
        Expectation::Latency {
            threshold,
            severity: severity.unwrap_or(IncidentSeverity::Performance),
        }
    }

    /// Body expectation, `PARTIAL` unless overridden.
    ///
    /// The pattern must match at the start of the body; `.` also matches
    /// newlines.
    pub fn regex(
        pattern: impl Into<String>,
        threshold: Option<f64>,
        severity: Option<IncidentSeverity>,
    ) -> Result<Self, MonitorError> {
        let pattern = pattern.into();
        let regex = RegexBuilder::new(&format!(r"\A(?:{})", pattern))
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| {
                MonitorError::InvalidExpectation(format!("invalid regex '{}': {}", pattern, e))
            })?;

        Ok(Expectation::Regex {
            pattern,
            regex,
            threshold,
            severity: severity.unwrap_or(IncidentSeverity::Partial),
        })
    }

    /// Configuration name of this expectation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Expectation::HttpStatus { .. } => "HTTP_STATUS",
            Expectation::Latency { .. } => "LATENCY",
            Expectation::Regex { .. } => "REGEX",
        }
    }

    /// Severity used when this expectation fails.
    pub fn severity(&self) -> IncidentSeverity {
        match self {
            Expectation::HttpStatus { severity, .. }
            | Expectation::Latency { severity, .. }
            | Expectation::Regex { severity, .. } => *severity,
        }
    }

    /// Judge one probe result.
    pub fn evaluate(&self, result: &ProbeResult) -> Verdict {
        let response = match result {
            ProbeResult::Response(response) => response,
            ProbeResult::TransportFailure(failure) => {
                return Verdict::fail(self.severity(), transport_message(failure));
            }
        };

        match self {
            Expectation::HttpStatus { range, severity } => {
                if range.contains(response.status) {
                    Verdict::pass(*severity)
                } else {
                    Verdict::fail(
                        *severity,
                        format!("Unexpected HTTP status ({})", response.status),
                    )
                }
            }
            Expectation::Latency {
                threshold,
                severity,
            } => {
                if response.elapsed <= *threshold {
                    Verdict::pass(*severity)
                } else {
                    Verdict::fail(
                        *severity,
                        format!(
                            "Latency above threshold: {:.4} seconds",
                            response.elapsed.as_secs_f64()
                        ),
                    )
                }
            }
            Expectation::Regex {
                regex, severity, ..
            } => {
                if regex.is_match(&response.body) {
                    Verdict::pass(*severity)
                } else {
                    Verdict::fail(*severity, "Regex did not match anything in the body")
                }
            }
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::HttpStatus { range, .. } => write!(f, "HTTP status range: {}", range),
            Expectation::Latency { threshold, .. } => {
                write!(f, "Latency threshold: {:.4} seconds", threshold.as_secs_f64())
            }
            Expectation::Regex { pattern, .. } => write!(f, "Regex: {}", pattern),
        }
    }
}

fn transport_message(failure: &TransportFailure) -> String {
    match failure.kind {
        TransportFailureKind::Timeout => format!("Request timed out: {}", failure.detail),
        TransportFailureKind::Connection => format!("The URL is unreachable: {}", failure.detail),
        TransportFailureKind::Tls => format!("TLS handshake failed: {}", failure.detail),
        TransportFailureKind::Request => format!("Unexpected HTTP response: {}", failure.detail),
    }
}

/// Result of one expectation against one probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    /// Severity to use if this verdict contributes to a failing tick.
    pub severity: IncidentSeverity,
    /// Failure description, absent on success.
    pub message: Option<String>,
}

impl Verdict {
    pub fn pass(severity: IncidentSeverity) -> Self {
        Self {
            passed: true,
            severity,
            message: None,
        }
    }

    pub fn fail(severity: IncidentSeverity, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            severity,
            message: Some(message.into()),
        }
    }
}

/// Aggregate judgement of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// True iff every expectation passed.
    pub passed: bool,
    /// Chosen severity of a failing tick.
    pub severity: Option<IncidentSeverity>,
    /// Message of the verdict that supplied the severity; empty on success.
    pub message: String,
}

impl TickOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            severity: None,
            message: String::new(),
        }
    }

    pub fn failed(severity: IncidentSeverity, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            severity: Some(severity),
            message: message.into(),
        }
    }

    /// Fold verdicts in declaration order.
    ///
    /// `MAJOR` anywhere among the failures wins; otherwise the first failure
    /// decides the severity.
    pub fn aggregate(verdicts: &[Verdict]) -> Self {
        let mut failures = verdicts.iter().filter(|v| !v.passed);
        let Some(first) = failures.next() else {
            return Self::passed();
        };

        let chosen = std::iter::once(first)
            .chain(failures)
            .find(|v| v.severity == IncidentSeverity::Major)
            .unwrap_or(first);

        Self::failed(chosen.severity, chosen.message.clone().unwrap_or_default())
    }

    /// Evaluate every expectation and aggregate.
    pub fn evaluate(expectations: &[Expectation], result: &ProbeResult) -> Self {
        let verdicts: Vec<Verdict> = expectations.iter().map(|e| e.evaluate(result)).collect();
        Self::aggregate(&verdicts)
    }
}
