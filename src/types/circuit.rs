//! Circuit-breaker state machine shared by the safety pipeline and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker state for one workload (or tenant). Transition rules
/// (see `safety::circuit_breaker`) are driven by `errorThreshold` /
/// `successThreshold` / `timeout` from `CircuitBreakerConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitState {
    pub kind: CircuitStateKind,
    pub consecutive_errors: u32,
    pub consecutive_successes: u32,
    pub last_transition: DateTime<Utc>,
}

impl CircuitState {
    pub fn closed(now: DateTime<Utc>) -> Self {
        Self {
            kind: CircuitStateKind::Closed,
            consecutive_errors: 0,
            consecutive_successes: 0,
            last_transition: now,
        }
    }
}
