//! Circuit breaker FSM: Closed → Open on `errorThreshold` consecutive
//! errors; Open → HalfOpen after `timeout` elapses; HalfOpen → Closed on
//! `successThreshold` consecutive successes, or back to Open on any
//! failure.

use chrono::{DateTime, Utc};

use crate::types::{CircuitBreakerConfig, CircuitState, CircuitStateKind};

/// Whether the circuit currently permits a reconcile to proceed. `Open`
/// blocks until `timeout` has elapsed since the last transition; once
/// elapsed the caller should record a probe result which transitions to
/// `HalfOpen` and is itself permitted through.
pub fn permits(state: &CircuitState, config: &CircuitBreakerConfig, now: DateTime<Utc>) -> bool {
    if !config.enabled {
        return true;
    }
    match state.kind {
        CircuitStateKind::Closed | CircuitStateKind::HalfOpen => true,
        CircuitStateKind::Open => {
            let elapsed = now.signed_duration_since(state.last_transition);
            elapsed >= chrono::Duration::seconds(config.timeout_secs as i64)
        }
    }
}

/// Record the outcome of a permitted reconcile attempt and return the
/// next `CircuitState`.
pub fn record_outcome(state: &CircuitState, config: &CircuitBreakerConfig, success: bool, now: DateTime<Utc>) -> CircuitState {
    if !config.enabled {
        return state.clone();
    }

    match state.kind {
        CircuitStateKind::Closed => {
            if success {
                CircuitState {
                    kind: CircuitStateKind::Closed,
                    consecutive_errors: 0,
                    consecutive_successes: state.consecutive_successes + 1,
                    last_transition: state.last_transition,
                }
            } else {
                let consecutive_errors = state.consecutive_errors + 1;
                if consecutive_errors >= config.error_threshold {
                    CircuitState {
                        kind: CircuitStateKind::Open,
                        consecutive_errors,
                        consecutive_successes: 0,
                        last_transition: now,
                    }
                } else {
                    CircuitState {
                        kind: CircuitStateKind::Closed,
                        consecutive_errors,
                        consecutive_successes: 0,
                        last_transition: state.last_transition,
                    }
                }
            }
        }
        CircuitStateKind::Open => {
            // A probe result arriving while Open (elapsed timeout already
            // checked by `permits`) enters HalfOpen immediately.
            let half_open = CircuitState {
                kind: CircuitStateKind::HalfOpen,
                consecutive_errors: state.consecutive_errors,
                consecutive_successes: 0,
                last_transition: now,
            };
            record_outcome(&half_open, config, success, now)
        }
        CircuitStateKind::HalfOpen => {
            if success {
                let consecutive_successes = state.consecutive_successes + 1;
                if consecutive_successes >= config.success_threshold {
                    CircuitState {
                        kind: CircuitStateKind::Closed,
                        consecutive_errors: 0,
                        consecutive_successes: 0,
                        last_transition: now,
                    }
                } else {
                    CircuitState {
                        kind: CircuitStateKind::HalfOpen,
                        consecutive_errors: state.consecutive_errors,
                        consecutive_successes,
                        last_transition: state.last_transition,
                    }
                }
            } else {
                CircuitState {
                    kind: CircuitStateKind::Open,
                    consecutive_errors: state.consecutive_errors + 1,
                    consecutive_successes: 0,
                    last_transition: now,
                }
            }
        }
    }
}
