//! Pod Disruption Budget safety check: is it safe to disrupt 1 pod given
//! the workload's current availability and the configured budget?

#[derive(Debug, Clone, Copy)]
pub enum BudgetLimit {
    MinAvailable(ResourceAmount),
    MaxUnavailable(ResourceAmount),
}

#[derive(Debug, Clone, Copy)]
pub enum ResourceAmount {
    Absolute(u32),
    /// Percentage (0..=100) of total replicas, resolved with ceiling
    /// rounding.
    Percent(f64),
}

impl ResourceAmount {
    fn resolve(self, total_replicas: u32) -> u32 {
        match self {
            ResourceAmount::Absolute(n) => n,
            ResourceAmount::Percent(p) => {
                let raw = (p / 100.0) * f64::from(total_replicas);
                raw.ceil() as u32
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisruptionCheck {
    pub total_replicas: u32,
    pub available_replicas: u32,
    pub current_unavailable: u32,
}

/// Planned disruption is always 1 pod. Safe iff
/// `availableReplicas - 1 >= minAvailable`, or
/// `currentUnavailable + 1 <= maxUnavailable`.
pub fn is_safe(check: DisruptionCheck, limit: BudgetLimit) -> bool {
    match limit {
        BudgetLimit::MinAvailable(amount) => {
            let min_available = amount.resolve(check.total_replicas);
            check.available_replicas.saturating_sub(1) >= min_available
        }
        BudgetLimit::MaxUnavailable(amount) => {
            let max_unavailable = amount.resolve(check.total_replicas);
            check.current_unavailable + 1 <= max_unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_min_available_four_of_five_is_safe() {
        let check = DisruptionCheck {
            total_replicas: 5,
            available_replicas: 5,
            current_unavailable: 0,
        };
        assert!(is_safe(check, BudgetLimit::MinAvailable(ResourceAmount::Absolute(4))));
    }

    #[test]
    fn s4_min_available_five_of_five_is_unsafe() {
        let check = DisruptionCheck {
            total_replicas: 5,
            available_replicas: 5,
            current_unavailable: 0,
        };
        assert!(!is_safe(check, BudgetLimit::MinAvailable(ResourceAmount::Absolute(5))));
    }

    #[test]
    fn percent_min_available_rounds_up() {
        // 50% of 5 replicas => ceil(2.5) = 3
        let check = DisruptionCheck {
            total_replicas: 5,
            available_replicas: 5,
            current_unavailable: 0,
        };
        assert!(is_safe(check, BudgetLimit::MinAvailable(ResourceAmount::Percent(50.0))));
    }

    #[test]
    fn max_unavailable_blocks_when_already_at_limit() {
        let check = DisruptionCheck {
            total_replicas: 5,
            available_replicas: 4,
            current_unavailable: 1,
        };
        assert!(!is_safe(check, BudgetLimit::MaxUnavailable(ResourceAmount::Absolute(1))));
    }
}
