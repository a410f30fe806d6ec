//! In-memory counters for reconciles, safety blocks, and circuit
//! transitions (§10.3 of the expanded spec). No network exporter —
//! metric ingestion and external exposition are out of scope — just a
//! `snapshot()` accessor the health surface and tests can read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub reconciles_total: u64,
    pub reconcile_errors_total: u64,
    pub applied_total: u64,
    pub circuit_opens_total: u64,
    pub circuit_closes_total: u64,
    pub safety_blocks_by_reason: HashMap<String, u64>,
}

/// Process-wide counters, dependency-injected like every other shared
/// mutable store in this crate (§9).
#[derive(Default)]
pub struct Metrics {
    reconciles_total: AtomicU64,
    reconcile_errors_total: AtomicU64,
    applied_total: AtomicU64,
    circuit_opens_total: AtomicU64,
    circuit_closes_total: AtomicU64,
    safety_blocks_by_reason: Mutex<HashMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reconcile(&self) {
        self.reconciles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconcile_error(&self) {
        self.reconcile_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_circuit_open(&self) {
        self.circuit_opens_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_circuit_close(&self) {
        self.circuit_closes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_safety_block(&self, reason: &str) {
        let mut guard = self.safety_blocks_by_reason.lock().unwrap_or_else(|e| e.into_inner());
        *guard.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reconciles_total: self.reconciles_total.load(Ordering::Relaxed),
            reconcile_errors_total: self.reconcile_errors_total.load(Ordering::Relaxed),
            applied_total: self.applied_total.load(Ordering::Relaxed),
            circuit_opens_total: self.circuit_opens_total.load(Ordering::Relaxed),
            circuit_closes_total: self.circuit_closes_total.load(Ordering::Relaxed),
            safety_blocks_by_reason: self.safety_blocks_by_reason.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}
