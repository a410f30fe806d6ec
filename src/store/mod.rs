//! Sample Store — retains recent container samples per workload and
//! answers windowed queries. Process-local, rebuilt from the live metric
//! ingester on restart (no persistence by design, see spec Non-goals).

use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::{Sample, WorkloadKey};

/// Retention policy: samples older than `max_age` are evicted; if a
/// workload's bucket exceeds `max_samples`, the oldest entries are
/// dropped first regardless of age.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub max_samples: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(7 * 24 * 3600),
            max_samples: 10_000,
        }
    }
}

/// Thread-safe, append-only-per-key sample store keyed by workload.
/// Each bucket is individually lock-striped via `RwLock` inside a
/// concurrent map, so writers to different workloads never contend.
pub struct SampleStore {
    buckets: DashMap<WorkloadKey, RwLock<Vec<Sample>>>,
    retention: RetentionPolicy,
}

impl SampleStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            buckets: DashMap::new(),
            retention,
        }
    }

    /// Insert a sample for the given workload, ordered by timestamp.
    /// Insertion keeps the bucket sorted ascending by timestamp — in
    /// the common case samples arrive in order and this degenerates to
    /// an O(1) push; out-of-order arrivals are inserted in place.
    pub fn add(&self, workload: WorkloadKey, sample: Sample) {
        let bucket = self
            .buckets
            .entry(workload)
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut guard = bucket.write().unwrap_or_else(|e| e.into_inner());
        let pos = guard
            .binary_search_by(|s| s.timestamp.cmp(&sample.timestamp))
            .unwrap_or_else(|p| p);
        guard.insert(pos, sample);
        if guard.len() > self.retention.max_samples {
            let overflow = guard.len() - self.retention.max_samples;
            guard.drain(0..overflow);
        }
    }

    /// Query samples for a workload within the last `window`, ascending
    /// by timestamp. Returns a stable, owned snapshot.
    pub fn get_by_workload(&self, workload: &WorkloadKey, window: Duration) -> Vec<Sample> {
        let Some(bucket) = self.buckets.get(workload) else {
            return Vec::new();
        };
        let guard = bucket.read().unwrap_or_else(|e| e.into_inner());
        let cutoff = Utc::now() - chrono::Duration::from_std(window).unwrap_or_default();
        guard
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Drop samples older than the retention age across all workloads.
    /// Count-based eviction happens inline in `add`; this handles the
    /// age-based half of the retention policy and should be called
    /// periodically by a background task.
    pub fn evict(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.retention.max_age).unwrap_or_default();
        for entry in self.buckets.iter() {
            let mut guard = entry.value().write().unwrap_or_else(|e| e.into_inner());
            guard.retain(|s| s.timestamp >= cutoff);
        }
    }

    pub fn workload_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn sample_count(&self, workload: &WorkloadKey) -> usize {
        self.buckets
            .get(workload)
            .map(|b| b.read().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    /// Oldest-timestamp-first cutoff used in conjunction with
    /// `DateTime::now()` at call sites that need "samples up to a cached
    /// instant" rather than "now" (useful for deterministic tests).
    pub fn get_by_workload_as_of(
        &self,
        workload: &WorkloadKey,
        window: Duration,
        as_of: DateTime<Utc>,
    ) -> Vec<Sample> {
        let Some(bucket) = self.buckets.get(workload) else {
            return Vec::new();
        };
        let guard = bucket.read().unwrap_or_else(|e| e.into_inner());
        let cutoff = as_of - chrono::Duration::from_std(window).unwrap_or_default();
        guard
            .iter()
            .filter(|s| s.timestamp >= cutoff && s.timestamp <= as_of)
            .cloned()
            .collect()
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
