//! Immutable usage samples and the workload key they are indexed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of workload this optimizer can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        };
        write!(f, "{s}")
    }
}

/// The unit of optimization: (namespace, kind, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub kind: WorkloadKind,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, kind: WorkloadKind, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
        }
    }

    /// `namespace/name`, used as the work-queue key and log field.
    pub fn queue_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Per-container usage + current request, as observed at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSample {
    pub container: String,
    pub cpu_millicores: f64,
    pub memory_bytes: f64,
    pub request_cpu_millicores: f64,
    pub request_memory_bytes: f64,
}

/// One snapshot of a pod's containers at a point in time. Immutable after
/// insertion into the sample store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub namespace: String,
    pub pod: String,
    pub containers: Vec<ContainerSample>,
}

impl Sample {
    /// Derive the owning workload name by stripping replicaset/pod hash
    /// suffixes. Pods get two dash-separated suffix groups stripped
    /// (`<workload>-<rs-hash>-<pod-hash>`), replicasets get one
    /// (`<workload>-<rs-hash>`). Falls back to the full name when fewer
    /// than three segments are present.
    pub fn derive_pod_workload_name(pod_name: &str) -> String {
        strip_suffix_segments(pod_name, 2)
    }

    /// Same derivation for a bare replicaset name.
    pub fn derive_replicaset_workload_name(rs_name: &str) -> String {
        strip_suffix_segments(rs_name, 1)
    }
}

fn strip_suffix_segments(name: &str, groups: usize) -> String {
    let segments: Vec<&str> = name.split('-').collect();
    if segments.len() < 3 {
        return name.to_string();
    }
    let keep = segments.len().saturating_sub(groups);
    if keep == 0 {
        return name.to_string();
    }
    segments[..keep].join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_pod_hash_suffixes() {
        assert_eq!(
            Sample::derive_pod_workload_name("api-7d4f8c9b6d-x2z9k"),
            "api"
        );
    }

    #[test]
    fn strips_replicaset_hash_suffix() {
        assert_eq!(
            Sample::derive_replicaset_workload_name("api-7d4f8c9b6d"),
            "api"
        );
    }

    #[test]
    fn falls_back_below_three_segments() {
        assert_eq!(Sample::derive_pod_workload_name("api-x2z9k"), "api-x2z9k");
        assert_eq!(Sample::derive_pod_workload_name("api"), "api");
    }

    #[test]
    fn queue_key_format() {
        let key = WorkloadKey::new("prod", WorkloadKind::Deployment, "api");
        assert_eq!(key.queue_key(), "prod/api");
    }
}
