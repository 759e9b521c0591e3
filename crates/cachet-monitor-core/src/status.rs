//! Component, incident and severity codes.
//!
//! Numeric values follow Cachet's API: component statuses 1..=4 and
//! incident statuses 0..=4.

use serde::{Deserialize, Serialize};

/// Externally visible health of a monitored component.
///
/// Ordered by badness: `Operational < PerformanceIssues < PartialOutage < MajorOutage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Status reported by the status page that we cannot map.
    Unknown,
    Operational,
    PerformanceIssues,
    PartialOutage,
    MajorOutage,
}

impl ComponentStatus {
    /// Cachet status code.
    pub fn code(&self) -> u8 {
        match self {
            ComponentStatus::Unknown => 0,
            ComponentStatus::Operational => 1,
            ComponentStatus::PerformanceIssues => 2,
            ComponentStatus::PartialOutage => 3,
            ComponentStatus::MajorOutage => 4,
        }
    }

    /// Decode a Cachet status code.
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => ComponentStatus::Operational,
            2 => ComponentStatus::PerformanceIssues,
            3 => ComponentStatus::PartialOutage,
            4 => ComponentStatus::MajorOutage,
            _ => ComponentStatus::Unknown,
        }
    }

    pub fn is_operational(&self) -> bool {
        *self == ComponentStatus::Operational
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Unknown => write!(f, "UNKNOWN"),
            ComponentStatus::Operational => write!(f, "OPERATIONAL"),
            ComponentStatus::PerformanceIssues => write!(f, "PERFORMANCE_ISSUES"),
            ComponentStatus::PartialOutage => write!(f, "PARTIAL_OUTAGE"),
            ComponentStatus::MajorOutage => write!(f, "MAJOR_OUTAGE"),
        }
    }
}

/// Classification of a failing expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentSeverity {
    Performance,
    Partial,
    Major,
}

impl IncidentSeverity {
    /// Component status an outage of this severity maps to.
    pub fn component_status(&self) -> ComponentStatus {
        match self {
            IncidentSeverity::Performance => ComponentStatus::PerformanceIssues,
            IncidentSeverity::Partial => ComponentStatus::PartialOutage,
            IncidentSeverity::Major => ComponentStatus::MajorOutage,
        }
    }
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentSeverity::Performance => write!(f, "PERFORMANCE"),
            IncidentSeverity::Partial => write!(f, "PARTIAL"),
            IncidentSeverity::Major => write!(f, "MAJOR"),
        }
    }
}

/// Lifecycle status of a Cachet incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Scheduled,
    Investigating,
    Identified,
    Watching,
    Fixed,
}

impl IncidentStatus {
    /// Cachet status code.
    pub fn code(&self) -> u8 {
        match self {
            IncidentStatus::Scheduled => 0,
            IncidentStatus::Investigating => 1,
            IncidentStatus::Identified => 2,
            IncidentStatus::Watching => 3,
            IncidentStatus::Fixed => 4,
        }
    }
}
