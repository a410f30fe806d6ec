//! Named interfaces for the out-of-scope external collaborators (§1, §6):
//! the workload mutator and the SLA metric source. The core pipeline only
//! ever calls through these traits — it never builds a cluster client,
//! never parses a kubeconfig, and never ingests metrics itself.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::sla::MetricObservation;
use crate::types::WorkloadKey;

/// One field-level change the mutator made (or would make, in a dry run).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub container: String,
    pub field: String,
    pub previous: String,
    pub new: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum MutateError {
    #[error("cluster API call timed out after {0:?}")]
    Timeout(Duration),
    #[error("workload {0:?} not found")]
    NotFound(WorkloadKey),
    #[error("rollout did not stabilize before the budget elapsed")]
    RolloutTimeout,
    #[error("transient API error: {0}")]
    Transient(String),
}

/// The update strategy the mutator chose, surfaced for logging and
/// status: in-place where the platform supports it, else a rolling
/// update that waits for the new generation to roll out fully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStrategy {
    InPlace,
    RollingUpdate,
}

/// External collaborator that actually patches `Deployment`/`StatefulSet`/
/// `DaemonSet`-shaped objects. A `dry_run` call MUST NOT touch the
/// cluster; it returns the diff the live call would have made.
#[async_trait::async_trait]
pub trait WorkloadMutator: Send + Sync {
    async fn apply(
        &self,
        workload: &WorkloadKey,
        recommendation: &crate::types::WorkloadRecommendation,
        dry_run: bool,
    ) -> Result<(ApplyStrategy, Vec<FieldChange>), MutateError>;
}

/// External collaborator that pulls SLA metrics on demand; the core never
/// ingests metrics itself (see `MetricSource` vs. the sample-store write
/// path, which is populated by the caller's own ingestion loop).
pub trait MetricSource: Send + Sync {
    fn get_metrics(
        &self,
        namespace: &str,
        workload: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Vec<MetricObservation>;
}

/// A `MetricSource` that always reports a healthy, empty series. Grounded
/// on the spec's Open Question about `checkSystemHealth` (§9): the
/// pre-wired behavior is a stub returning a healthy result, with the
/// trait boundary kept clean so a real metric-source implementation can
/// be swapped in without touching the safety pipeline.
pub struct AlwaysHealthySource;

impl MetricSource for AlwaysHealthySource {
    fn get_metrics(&self, _namespace: &str, _workload: &str, _window: Duration, _now: DateTime<Utc>) -> Vec<MetricObservation> {
        Vec::new()
    }
}
