//! Endpoint monitor state machine.
//!
//! ```text
//!                 fail (count > allowed)                fail, worse severity
//!  OPERATIONAL ───────────────────────────▶ OUTAGE(s) ─────────────────────▶ OUTAGE(s')
//!       ▲                                       │
//!       └──────────────── pass ─────────────────┘
//! ```
//!
//! Passing ticks always reset the failure counter. Failing ticks within the
//! tolerated budget never change the status, and a failing tick never moves
//! the status to a less severe outage.

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::expectation::TickOutcome;
use crate::status::{ComponentStatus, IncidentSeverity};

/// Kind of status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Operational endpoint crossed its failure budget.
    OutageStart,
    /// Ongoing outage moved to a strictly worse status.
    OutageEscalate,
    /// Non-operational endpoint passed a tick.
    Recovery,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::OutageStart => write!(f, "OUTAGE_START"),
            TransitionKind::OutageEscalate => write!(f, "OUTAGE_ESCALATE"),
            TransitionKind::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// A status change decided by [`MonitorState::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub previous: ComponentStatus,
    pub current: ComponentStatus,
    /// Severity of the failing tick; `None` for recoveries.
    pub severity: Option<IncidentSeverity>,
    /// Failure message of the tick; empty for recoveries.
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Mutable monitoring state of one endpoint.
///
/// Owned by exactly one worker; never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    status: ComponentStatus,
    consecutive_fail_count: u32,
    open_incident_id: Option<u64>,
    last_transition_at: Option<DateTime<Utc>>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    /// Operational, no failures, no incident.
    pub fn new() -> Self {
        Self {
            status: ComponentStatus::Operational,
            consecutive_fail_count: 0,
            open_incident_id: None,
            last_transition_at: None,
        }
    }

    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    pub fn consecutive_fail_count(&self) -> u32 {
        self.consecutive_fail_count
    }

    pub fn open_incident_id(&self) -> Option<u64> {
        self.open_incident_id
    }

    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        self.last_transition_at
    }

    /// Fold one tick into the state.
    pub fn advance(&mut self, outcome: &TickOutcome, allowed_fails: u32) -> Option<TransitionEvent> {
        self.advance_at(outcome, allowed_fails, Utc::now())
    }

    /// [`advance`](Self::advance) with an explicit clock.
    pub fn advance_at(
        &mut self,
        outcome: &TickOutcome,
        allowed_fails: u32,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        if outcome.passed {
            self.consecutive_fail_count = 0;
            if self.status.is_operational() {
                return None;
            }
            return Some(self.transition(
                TransitionKind::Recovery,
                ComponentStatus::Operational,
                None,
                String::new(),
                now,
            ));
        }

        self.consecutive_fail_count = self.consecutive_fail_count.saturating_add(1);
        if self.consecutive_fail_count <= allowed_fails {
            return None;
        }

        // A failing outcome always carries a severity; fall back to the
        // mildest outage rather than leaving the transition undefined.
        let severity = outcome.severity.unwrap_or(IncidentSeverity::Partial);
        let target = severity.component_status();

        if self.status.is_operational() {
            Some(self.transition(
                TransitionKind::OutageStart,
                target,
                Some(severity),
                outcome.message.clone(),
                now,
            ))
        } else if target > self.status {
            Some(self.transition(
                TransitionKind::OutageEscalate,
                target,
                Some(severity),
                outcome.message.clone(),
                now,
            ))
        } else {
            None
        }
    }

    /// Record the incident opened for the current outage.
    ///
    /// Ignored while operational or when an incident is already held, so an
    /// outage episode gets at most one incident.
    pub fn set_open_incident(&mut self, id: u64) -> bool {
        if self.status.is_operational() || self.open_incident_id.is_some() {
            return false;
        }
        self.open_incident_id = Some(id);
        true
    }

    /// Take the open incident on recovery.
    ///
    /// Returns `None` while the endpoint is still failing.
    pub fn take_open_incident(&mut self) -> Option<u64> {
        if !self.status.is_operational() {
            return None;
        }
        self.open_incident_id.take()
    }

    fn transition(
        &mut self,
        kind: TransitionKind,
        target: ComponentStatus,
        severity: Option<IncidentSeverity>,
        message: String,
        now: DateTime<Utc>,
    ) -> TransitionEvent {
        let previous = self.status;
        self.status = target;
        self.last_transition_at = Some(now);

        TransitionEvent {
            kind,
            previous,
            current: target,
            severity,
            message,
            at: now,
        }
    }
}
