//! Anomaly Detectors — three independent methods plus a consensus
//! aggregator, and a workload-level gate consumed by the safety pipeline.

pub mod consensus;
pub mod iqr;
pub mod moving_average;
pub mod workload_gate;
pub mod zscore;

pub use consensus::{consensus_detect, ConsensusConfig};
pub use iqr::{iqr_detect, IqrConfig};
pub use moving_average::{moving_average_detect, MovingAverageConfig};
pub use workload_gate::{check_workload_anomalies, WorkloadAnomalyReport};
pub use zscore::{zscore_detect, ZScoreConfig};

/// Default minimum samples required before any detector runs.
pub const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One flagged anomaly from a single detector.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Anomaly {
    pub index: usize,
    pub severity: Severity,
    pub deviation: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}
