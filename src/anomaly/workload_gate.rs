//! Workload-anomaly gate: aggregates container samples into ΣCPU/ΣMemory
//! series, runs consensus detection on each, and decides whether the
//! safety pipeline should block scaling for this workload.

use serde::{Deserialize, Serialize};

use crate::types::Sample;

use super::{consensus::consensus_detect, Anomaly, ConsensusConfig, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyType {
    CpuSpike,
    CpuDrop,
    MemorySpike,
    MemoryDrop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedAnomaly {
    pub anomaly_type: AnomalyType,
    pub index: usize,
    pub severity: Severity,
    pub deviation: f64,
}

#[derive(Debug, Clone)]
pub struct WorkloadAnomalyReport {
    pub anomalies: Vec<TypedAnomaly>,
    pub should_block_scaling: bool,
}

/// Minimum count of anomalies (combined CPU+memory) at which a High/
/// Critical severity blocks scaling even without a lone Critical hit.
pub const DEFAULT_MIN_BLOCKING_COUNT: usize = 3;

fn sum_series(samples: &[Sample], pick: impl Fn(&crate::types::ContainerSample) -> f64) -> Vec<f64> {
    samples
        .iter()
        .map(|s| s.containers.iter().map(&pick).sum())
        .collect()
}

pub fn check_workload_anomalies(
    samples: &[Sample],
    config: ConsensusConfig,
    min_blocking_count: usize,
) -> WorkloadAnomalyReport {
    let cpu_series = sum_series(samples, |c| c.cpu_millicores);
    let mem_series = sum_series(samples, |c| c.memory_bytes);

    let cpu_mean = crate::stats::mean(&cpu_series);
    let mem_mean = crate::stats::mean(&mem_series);

    let label = |anomalies: Vec<Anomaly>, series: &[f64], mean: f64, spike: AnomalyType, drop: AnomalyType| {
        anomalies
            .into_iter()
            .map(|a| {
                let anomaly_type = if series[a.index] > mean { spike } else { drop };
                TypedAnomaly {
                    anomaly_type,
                    index: a.index,
                    severity: a.severity,
                    deviation: a.deviation,
                }
            })
            .collect::<Vec<_>>()
    };

    let mut anomalies = label(
        consensus_detect(&cpu_series, config),
        &cpu_series,
        cpu_mean,
        AnomalyType::CpuSpike,
        AnomalyType::CpuDrop,
    );
    anomalies.extend(label(
        consensus_detect(&mem_series, config),
        &mem_series,
        mem_mean,
        AnomalyType::MemorySpike,
        AnomalyType::MemoryDrop,
    ));

    let highest = anomalies.iter().map(|a| a.severity).max();
    let has_high_or_critical = matches!(highest, Some(Severity::High) | Some(Severity::Critical));
    let should_block_scaling = has_high_or_critical
        && (matches!(highest, Some(Severity::Critical))
            || anomalies.len() >= min_blocking_count
            || anomalies.iter().any(|a| a.severity >= Severity::High));

    WorkloadAnomalyReport {
        anomalies,
        should_block_scaling,
    }
}
