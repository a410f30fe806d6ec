//! The tenant-scoped `Config` object: declarative optimization policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::WorkloadKind;

/// Sizing aggressiveness. Affects defaults picked by the profile resolver
/// and the Pareto optimizer's profile-based selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Aggressive,
    Balanced,
    Conservative,
}

/// Named bundle of recommendation defaults. `Custom` takes all values from
/// `profile_overrides` with no named-bundle starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Production,
    Staging,
    Development,
    Test,
    Custom,
}

/// The 15 recommendation knobs tunable per profile or per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationKnobs {
    pub cpu_percentile: f64,
    pub mem_percentile: f64,
    pub safety_margin: f64,
    pub min_samples: usize,
    pub history_window_hours: u32,
    pub min_millicores: f64,
    pub max_millicores: f64,
    pub min_megabytes: f64,
    pub max_megabytes: f64,
    pub min_confidence: f64,
    pub max_change_percent: f64,
    pub require_approval: bool,
    pub oom_boost_default: f64,
    pub confidence_floor_samples: usize,
    pub significant_variation_cv: f64,
}

/// Structured per-tenant overrides layered on top of a named profile's
/// defaults. All fields are optional; `None` means "inherit from profile".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    pub cpu_percentile: Option<f64>,
    pub mem_percentile: Option<f64>,
    pub safety_margin: Option<f64>,
    pub min_samples: Option<usize>,
    pub history_window_hours: Option<u32>,
    pub min_millicores: Option<f64>,
    pub max_millicores: Option<f64>,
    pub min_megabytes: Option<f64>,
    pub max_megabytes: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_change_percent: Option<f64>,
    pub require_approval: Option<bool>,
    pub oom_boost_default: Option<f64>,
    pub confidence_floor_samples: Option<usize>,
    pub significant_variation_cv: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub error_threshold: u32,
    pub success_threshold: u32,
    pub timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_threshold: 5,
            success_threshold: 3,
            timeout_secs: 60,
        }
    }
}

/// Policy for reacting to an external horizontal autoscaler targeting the
/// same workload on a CPU/memory metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoscalerConflictPolicy {
    Skip,
    Warn,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerAwareness {
    pub enabled: bool,
    pub conflict_policy: AutoscalerConflictPolicy,
}

impl Default for AutoscalerAwareness {
    fn default() -> Self {
        Self {
            enabled: true,
            conflict_policy: AutoscalerConflictPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisruptionBudgetAwareness {
    pub enabled: bool,
}

impl Default for DisruptionBudgetAwareness {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A cron-defined interval during which live mutations are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub cron: String,
    pub duration_minutes: u32,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitOpsFormat {
    StrategicMerge,
    JsonPatch,
    HelmValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitOpsExportConfig {
    pub enabled: bool,
    pub format: GitOpsFormat,
    pub output_path: String,
    pub git_url: Option<String>,
    pub auto_commit: bool,
    pub emit_limits: bool,
}

impl Default for GitOpsExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: GitOpsFormat::StrategicMerge,
            output_path: "./gitops-out".to_string(),
            git_url: None,
            auto_commit: false,
            emit_limits: false,
        }
    }
}

/// Percentile aggregation for latency-style SLA metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyAggregation {
    P50,
    P90,
    P95,
    P99,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaMetricKind {
    Latency,
    ErrorRate,
    Availability,
    Throughput,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaDefinition {
    pub name: String,
    pub kind: SlaMetricKind,
    pub threshold: f64,
    pub window_minutes: u32,
    pub latency_aggregation: Option<LatencyAggregation>,
    /// Smaller-is-better (latency, error rate) vs bigger-is-better
    /// (availability, throughput).
    pub minimize: bool,
}

/// The tenant-scoped optimization policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub enabled: bool,
    pub target_namespaces: Vec<String>,
    pub target_kinds: Vec<WorkloadKind>,
    pub exclude_workloads: Vec<String>,
    pub strategy: Strategy,
    pub profile: Profile,
    pub profile_overrides: Option<ProfileOverrides>,
    pub dry_run: bool,
    pub circuit_breaker: CircuitBreakerConfig,
    pub autoscaler_awareness: AutoscalerAwareness,
    pub disruption_budget_awareness: DisruptionBudgetAwareness,
    pub maintenance_windows: Vec<MaintenanceWindow>,
    pub gitops: GitOpsExportConfig,
    pub sla_definitions: Vec<SlaDefinition>,
    pub generation: i64,
}

/// Control-loop phases for `Status.phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Pending,
    Active,
    Paused,
    CircuitOpen,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A typed, deduplicated-by-type status condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub condition_type: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

/// `Status` sub-resource: observed state of one reconciled `Config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub phase: Phase,
    pub observed_generation: i64,
    pub last_reconcile_time: Option<DateTime<Utc>>,
    pub active_maintenance_window: Option<usize>,
    pub next_maintenance_window_start: Option<DateTime<Utc>>,
    pub circuit_state: super::circuit::CircuitStateKind,
    pub consecutive_successes: u32,
    pub consecutive_errors: u32,
    pub total_applied: u64,
    pub total_skipped: u64,
    pub total_failed: u64,
    pub conditions: super::condition::ConditionSet,
}

impl Status {
    pub fn new_pending() -> Self {
        Self {
            phase: Phase::Pending,
            observed_generation: 0,
            last_reconcile_time: None,
            active_maintenance_window: None,
            next_maintenance_window_start: None,
            circuit_state: super::circuit::CircuitStateKind::Closed,
            consecutive_successes: 0,
            consecutive_errors: 0,
            total_applied: 0,
            total_skipped: 0,
            total_failed: 0,
            conditions: super::condition::ConditionSet::default(),
        }
    }
}
