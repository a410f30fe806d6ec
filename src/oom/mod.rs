//! OOM history: a process-wide map of per-container restart counts,
//! consulted by the recommendation engine's memory boost (§4.7) and
//! guarded the same way as the sample store (§5) rather than ad hoc.

use dashmap::DashMap;

use crate::recommend::OomHistory;
use crate::types::WorkloadKey;

/// Dependency-injected (§9 "Design Notes") rather than a package-level
/// global, so tests can substitute a fresh store per case.
#[derive(Default)]
pub struct OomHistoryStore {
    restarts: DashMap<(WorkloadKey, String), u32>,
}

impl OomHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed restart-count for a container, overwriting any
    /// prior value (the caller is expected to pass the cumulative count
    /// as currently reported by the cluster, not a delta).
    pub fn record(&self, workload: WorkloadKey, container: impl Into<String>, restart_count: u32) {
        self.restarts.insert((workload, container.into()), restart_count);
    }

    pub fn get(&self, workload: &WorkloadKey, container: &str) -> OomHistory {
        let restart_count = self
            .restarts
            .get(&(workload.clone(), container.to_string()))
            .map(|v| *v)
            .unwrap_or(0);
        OomHistory { restart_count }
    }

    /// Drop all history for a workload, e.g. when it is removed from the
    /// target set or deleted.
    pub fn clear_workload(&self, workload: &WorkloadKey) {
        self.restarts.retain(|(k, _), _| k != workload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkloadKind;

    fn key() -> WorkloadKey {
        WorkloadKey::new("prod", WorkloadKind::Deployment, "api")
    }

    #[test]
    fn unknown_container_has_zero_restarts() {
        let store = OomHistoryStore::new();
        assert_eq!(store.get(&key(), "app").restart_count, 0);
    }

    #[test]
    fn records_and_returns_latest_restart_count() {
        let store = OomHistoryStore::new();
        store.record(key(), "app", 3);
        assert_eq!(store.get(&key(), "app").restart_count, 3);
        store.record(key(), "app", 5);
        assert_eq!(store.get(&key(), "app").restart_count, 5);
    }

    #[test]
    fn clear_workload_removes_only_that_workloads_entries() {
        let store = OomHistoryStore::new();
        let other = WorkloadKey::new("prod", WorkloadKind::Deployment, "worker");
        store.record(key(), "app", 3);
        store.record(other.clone(), "app", 7);
        store.clear_workload(&key());
        assert_eq!(store.get(&key(), "app").restart_count, 0);
        assert_eq!(store.get(&other, "app").restart_count, 7);
    }
}
