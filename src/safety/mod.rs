//! Safety Pipeline: the ordered, short-circuiting sequence of checks a
//! recommendation must clear before it is applied live (§4.9).

pub mod autoscaler;
pub mod circuit_breaker;
pub mod disruption_budget;
pub mod maintenance_window;

use chrono::{DateTime, Utc};

use crate::anomaly::workload_gate::WorkloadAnomalyReport;
use crate::profile::{ResolvedSettings, ShouldApplyReason};
use crate::sla::SlaReport;
use crate::types::{AutoscalerAwareness, CircuitBreakerConfig, CircuitState, MaintenanceWindow};

use autoscaler::{AutoscalerDecision, ExternalAutoscaler};
use disruption_budget::{BudgetLimit, DisruptionCheck};

#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    PreOptSla { health_score: f64 },
    AutoscalerConflict,
    DisruptionBudget,
    Anomaly,
    CircuitOpen,
    OutsideMaintenanceWindow,
    ShouldApply(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SafetyDecision {
    /// Cleared every gate; carries whether the applying step should also
    /// emit an autoscaler-conflict warning event despite proceeding.
    Proceed { autoscaler_warning: bool },
    Blocked { reason: BlockReason, live_mutation_only: bool },
}

pub struct SafetyInputs<'a> {
    pub pre_opt_sla: &'a SlaReport,
    pub autoscalers: &'a [ExternalAutoscaler],
    pub autoscaler_awareness: &'a AutoscalerAwareness,
    pub disruption_check: Option<DisruptionCheck>,
    pub disruption_limit: Option<BudgetLimit>,
    pub anomaly_report: &'a WorkloadAnomalyReport,
    pub circuit_state: &'a CircuitState,
    pub circuit_config: &'a CircuitBreakerConfig,
    pub maintenance_windows: &'a [MaintenanceWindow],
    pub resolved_settings: &'a ResolvedSettings,
    pub confidence: f64,
    pub change_percent: f64,
    pub now: DateTime<Utc>,
}

/// Evaluate the ordered safety pipeline. `dry_run` recommendations are
/// still blocked by every gate except the maintenance-window check, which
/// only blocks live mutation.
pub fn evaluate(inputs: &SafetyInputs) -> SafetyDecision {
    use crate::sla::should_block as sla_should_block;

    if sla_should_block(inputs.pre_opt_sla) {
        return SafetyDecision::Blocked {
            reason: BlockReason::PreOptSla { health_score: inputs.pre_opt_sla.health_score },
            live_mutation_only: false,
        };
    }

    let autoscaler_decision = autoscaler::check(inputs.autoscalers, inputs.autoscaler_awareness);
    if autoscaler_decision == AutoscalerDecision::Skip {
        return SafetyDecision::Blocked {
            reason: BlockReason::AutoscalerConflict,
            live_mutation_only: false,
        };
    }

    if let (Some(check), Some(limit)) = (inputs.disruption_check, inputs.disruption_limit) {
        if !disruption_budget::is_safe(check, limit) {
            return SafetyDecision::Blocked {
                reason: BlockReason::DisruptionBudget,
                live_mutation_only: false,
            };
        }
    }

    if inputs.anomaly_report.should_block_scaling {
        return SafetyDecision::Blocked {
            reason: BlockReason::Anomaly,
            live_mutation_only: false,
        };
    }

    if !circuit_breaker::permits(inputs.circuit_state, inputs.circuit_config, inputs.now) {
        return SafetyDecision::Blocked {
            reason: BlockReason::CircuitOpen,
            live_mutation_only: false,
        };
    }

    if !inputs.maintenance_windows.is_empty() && !maintenance_window::any_active(inputs.maintenance_windows, inputs.now) {
        return SafetyDecision::Blocked {
            reason: BlockReason::OutsideMaintenanceWindow,
            live_mutation_only: true,
        };
    }

    let (should_apply, reason) = inputs.resolved_settings.should_apply(inputs.confidence, inputs.change_percent);
    if !should_apply && reason != ShouldApplyReason::DryRun {
        return SafetyDecision::Blocked {
            reason: BlockReason::ShouldApply(reason.as_str()),
            live_mutation_only: false,
        };
    }

    SafetyDecision::Proceed {
        autoscaler_warning: autoscaler_decision == AutoscalerDecision::Warn,
    }
}
