//! Per-container sizing output produced on each reconcile.

use serde::{Deserialize, Serialize};

use super::sample::WorkloadKey;

/// Summary of the Pareto optimizer's candidate selection for a workload
/// (§4.6), attached to the recommendation for GitOps rationale and event
/// messages. Advisory only: it does not gate the safety pipeline, which
/// acts on the per-container sizing in `containers` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoAdvisory {
    pub selected_label: String,
    pub overall_score: f64,
    pub pareto_rank: usize,
    pub frontier_size: usize,
}

/// Summary of the time-pattern analyzer's classification for a workload
/// (§4.5), attached alongside the Pareto advisory when enough samples
/// span enough history to classify a pattern. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAdvisory {
    pub pattern: String,
    pub estimated_savings_percent: f64,
    pub schedule_entry_count: usize,
    /// One-step Holt-Winters forecast of the next seasonal period's total
    /// CPU (millicores), when enough daily history exists to fit a model
    /// (§4.4). `None` when the series is too short or no seasonal period
    /// could be detected.
    pub forecast_next_period_cpu_millicores: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecommendation {
    pub container: String,
    pub current_cpu_millicores: f64,
    pub recommended_cpu_millicores: f64,
    pub current_memory_bytes: f64,
    pub recommended_memory_bytes: f64,
    pub cpu_percentile: f64,
    pub mem_percentile: f64,
    /// 0..=100.
    pub confidence: f64,
    pub sample_count: usize,
    pub change_percent: f64,
    pub estimated_monthly_savings_usd: Option<f64>,
}

impl ContainerRecommendation {
    pub fn cpu_delta_percent(&self) -> f64 {
        percent_delta(self.current_cpu_millicores, self.recommended_cpu_millicores)
    }

    pub fn mem_delta_percent(&self) -> f64 {
        percent_delta(self.current_memory_bytes, self.recommended_memory_bytes)
    }
}

fn percent_delta(current: f64, recommended: f64) -> f64 {
    if current.abs() < f64::EPSILON {
        return 0.0;
    }
    ((recommended - current).abs() / current) * 100.0
}

/// Per-workload aggregate of its container recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRecommendation {
    pub workload: WorkloadKey,
    pub containers: Vec<ContainerRecommendation>,
    pub pareto: Option<ParetoAdvisory>,
    pub schedule: Option<ScheduleAdvisory>,
}

impl WorkloadRecommendation {
    pub fn total_current_cpu_millicores(&self) -> f64 {
        self.containers.iter().map(|c| c.current_cpu_millicores).sum()
    }

    pub fn total_recommended_cpu_millicores(&self) -> f64 {
        self.containers
            .iter()
            .map(|c| c.recommended_cpu_millicores)
            .sum()
    }
}
