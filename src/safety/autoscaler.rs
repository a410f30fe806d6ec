//! External horizontal autoscaler conflict check: if an HPA-like resource
//! already targets this workload on a CPU or memory metric, react per the
//! configured conflict policy.

use crate::types::{AutoscalerAwareness, AutoscalerConflictPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMetric {
    Cpu,
    Memory,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub struct ExternalAutoscaler {
    pub metric: ResourceMetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoscalerDecision {
    NoConflict,
    Skip,
    Warn,
    Ignore,
}

/// Inspect the workload's external autoscalers for a CPU/memory-targeting
/// conflict and resolve it against the configured policy.
pub fn check(autoscalers: &[ExternalAutoscaler], awareness: &AutoscalerAwareness) -> AutoscalerDecision {
    if !awareness.enabled {
        return AutoscalerDecision::NoConflict;
    }
    let conflicts = autoscalers
        .iter()
        .any(|a| matches!(a.metric, ResourceMetric::Cpu | ResourceMetric::Memory));
    if !conflicts {
        return AutoscalerDecision::NoConflict;
    }
    match awareness.conflict_policy {
        AutoscalerConflictPolicy::Skip => AutoscalerDecision::Skip,
        AutoscalerConflictPolicy::Warn => AutoscalerDecision::Warn,
        AutoscalerConflictPolicy::Ignore => AutoscalerDecision::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_autoscalers_means_no_conflict() {
        let awareness = AutoscalerAwareness { enabled: true, conflict_policy: AutoscalerConflictPolicy::Skip };
        assert_eq!(check(&[], &awareness), AutoscalerDecision::NoConflict);
    }

    #[test]
    fn cpu_targeting_hpa_triggers_skip_policy() {
        let awareness = AutoscalerAwareness { enabled: true, conflict_policy: AutoscalerConflictPolicy::Skip };
        let autoscalers = vec![ExternalAutoscaler { metric: ResourceMetric::Cpu }];
        assert_eq!(check(&autoscalers, &awareness), AutoscalerDecision::Skip);
    }

    #[test]
    fn non_resource_metric_is_not_a_conflict() {
        let awareness = AutoscalerAwareness { enabled: true, conflict_policy: AutoscalerConflictPolicy::Skip };
        let autoscalers = vec![ExternalAutoscaler { metric: ResourceMetric::Other }];
        assert_eq!(check(&autoscalers, &awareness), AutoscalerDecision::NoConflict);
    }

    #[test]
    fn disabled_awareness_ignores_conflicts() {
        let awareness = AutoscalerAwareness { enabled: false, conflict_policy: AutoscalerConflictPolicy::Skip };
        let autoscalers = vec![ExternalAutoscaler { metric: ResourceMetric::Memory }];
        assert_eq!(check(&autoscalers, &awareness), AutoscalerDecision::NoConflict);
    }
}
