//! Recommendation Engine: per-container percentile sizing, safety margin,
//! clamping, OOM-history boost, and confidence scoring.

use crate::stats;
use crate::types::{ContainerRecommendation, RecommendationKnobs, Sample, WorkloadKey, WorkloadRecommendation};

/// Observed restart-count history for a container, used for the OOM boost.
#[derive(Debug, Clone, Copy, Default)]
pub struct OomHistory {
    pub restart_count: u32,
}

impl OomHistory {
    /// 1.2 default; steps up to 1.3/1.5/1.75/2.0 at restart-count
    /// thresholds 1/3/5/10.
    pub fn boost_factor(&self, default_boost: f64) -> f64 {
        match self.restart_count {
            0 => default_boost,
            1..=2 => 1.3,
            3..=4 => 1.5,
            5..=9 => 1.75,
            _ => 2.0,
        }
    }
}

fn confidence_score(sample_count: usize, cv: f64, knobs: &RecommendationKnobs) -> f64 {
    let mut score = 50.0;
    let sample_bonus = if knobs.confidence_floor_samples == 0 {
        0.0
    } else {
        (sample_count as f64 / knobs.confidence_floor_samples as f64).min(1.0) * 30.0
    };
    score += sample_bonus;
    let cv_bonus = (1.0 - (cv / knobs.significant_variation_cv.max(f64::EPSILON)).min(1.0)).max(0.0) * 20.0;
    score += cv_bonus;
    score.min(100.0)
}

/// Recommend sizing for one container given its usage series and prior
/// request. Returns `None` when current and recommended are within 1% on
/// both CPU and memory (no-op recommendation suppressed).
pub fn recommend_container(
    container: &str,
    cpu_series: &[f64],
    mem_series: &[f64],
    current_cpu: f64,
    current_mem: f64,
    oom: OomHistory,
    knobs: &RecommendationKnobs,
) -> Option<ContainerRecommendation> {
    if cpu_series.len() < knobs.min_samples || mem_series.len() < knobs.min_samples {
        return None;
    }

    let cpu_p = stats::percentile(cpu_series, knobs.cpu_percentile);
    let mem_p = stats::percentile(mem_series, knobs.mem_percentile);

    let mut cpu_rec = cpu_p * knobs.safety_margin;
    let mut mem_rec = mem_p * knobs.safety_margin;

    cpu_rec = cpu_rec.clamp(knobs.min_millicores, knobs.max_millicores);
    mem_rec = mem_rec.clamp(knobs.min_megabytes * 1_048_576.0, knobs.max_megabytes * 1_048_576.0);

    if oom.restart_count > 0 {
        mem_rec *= oom.boost_factor(knobs.oom_boost_default);
        mem_rec = mem_rec.min(knobs.max_megabytes * 1_048_576.0);
    }

    let cpu_change = if current_cpu.abs() > f64::EPSILON { ((cpu_rec - current_cpu) / current_cpu).abs() } else { 1.0 };
    let mem_change = if current_mem.abs() > f64::EPSILON { ((mem_rec - current_mem) / current_mem).abs() } else { 1.0 };
    if cpu_change < 0.01 && mem_change < 0.01 {
        return None;
    }

    let cpu_mean = stats::mean(cpu_series);
    let cpu_cv = if cpu_mean.abs() > f64::EPSILON { stats::stddev(cpu_series) / cpu_mean } else { 0.0 };
    let confidence = confidence_score(cpu_series.len(), cpu_cv, knobs);
    let change_percent = cpu_change.max(mem_change) * 100.0;

    Some(ContainerRecommendation {
        container: container.to_string(),
        current_cpu_millicores: current_cpu,
        recommended_cpu_millicores: cpu_rec,
        current_memory_bytes: current_mem,
        recommended_memory_bytes: mem_rec,
        cpu_percentile: knobs.cpu_percentile,
        mem_percentile: knobs.mem_percentile,
        confidence,
        sample_count: cpu_series.len(),
        change_percent,
        estimated_monthly_savings_usd: None,
    })
}

/// Collect per-container CPU/memory series from a workload's recent
/// samples, preserving container identity.
pub fn container_series(samples: &[Sample]) -> std::collections::HashMap<String, (Vec<f64>, Vec<f64>)> {
    let mut out: std::collections::HashMap<String, (Vec<f64>, Vec<f64>)> = std::collections::HashMap::new();
    for sample in samples {
        for c in &sample.containers {
            let entry = out.entry(c.container.clone()).or_default();
            entry.0.push(c.cpu_millicores);
            entry.1.push(c.memory_bytes);
        }
    }
    out
}

/// Build a `WorkloadRecommendation` from per-container recommendations,
/// returning `None` if no container produced one.
pub fn build_workload_recommendation(
    workload: WorkloadKey,
    containers: Vec<ContainerRecommendation>,
) -> Option<WorkloadRecommendation> {
    if containers.is_empty() {
        return None;
    }
    Some(WorkloadRecommendation { workload, containers, pareto: None, schedule: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knobs() -> RecommendationKnobs {
        RecommendationKnobs {
            cpu_percentile: 95.0,
            mem_percentile: 95.0,
            safety_margin: 1.2,
            min_samples: 10,
            history_window_hours: 168,
            min_millicores: 10.0,
            max_millicores: 100_000.0,
            min_megabytes: 16.0,
            max_megabytes: 1_000_000.0,
            min_confidence: 0.0,
            max_change_percent: 100.0,
            require_approval: false,
            oom_boost_default: 1.2,
            confidence_floor_samples: 100,
            significant_variation_cv: 0.25,
        }
    }

    #[test]
    fn s1_flat_data_yields_no_recommendation() {
        let cpu = vec![100.0; 100];
        let mem = vec![128.0 * 1_048_576.0; 100];
        let rec = recommend_container("app", &cpu, &mem, 100.0, 128.0 * 1_048_576.0, OomHistory::default(), &knobs());
        assert!(rec.is_none(), "expected flat usage at current request to suppress recommendation");
    }

    #[test]
    fn s2_p95_undersized_current_triggers_scale_down() {
        // 200 samples spanning 100..400m, current request 1000m.
        let cpu: Vec<f64> = (0..200).map(|i| 100.0 + (i % 300) as f64).collect();
        let mem = vec![256.0 * 1_048_576.0; 200];
        let rec = recommend_container("app", &cpu, &mem, 1000.0, 256.0 * 1_048_576.0, OomHistory::default(), &knobs())
            .expect("expected a scale-down recommendation");
        assert!(
            (rec.recommended_cpu_millicores - 480.0).abs() / 480.0 < 0.05,
            "expected ~480m, got {}",
            rec.recommended_cpu_millicores
        );
        assert!((rec.change_percent - 52.0).abs() < 5.0, "expected ~52% change, got {}", rec.change_percent);
    }

    #[test]
    fn oom_history_boosts_memory_recommendation() {
        let cpu = vec![200.0; 50];
        let mem = vec![256.0 * 1_048_576.0; 50];
        let no_oom = recommend_container("app", &cpu, &mem, 400.0, 1.0 * 1_048_576.0, OomHistory::default(), &knobs());
        let with_oom = recommend_container(
            "app",
            &cpu,
            &mem,
            400.0,
            1.0 * 1_048_576.0,
            OomHistory { restart_count: 5 },
            &knobs(),
        );
        assert!(with_oom.unwrap().recommended_memory_bytes > no_oom.unwrap().recommended_memory_bytes);
    }

    #[test]
    fn insufficient_samples_yields_no_recommendation() {
        let cpu = vec![500.0; 3];
        let mem = vec![256.0 * 1_048_576.0; 3];
        assert!(recommend_container("app", &cpu, &mem, 100.0, 1.0, OomHistory::default(), &knobs()).is_none());
    }
}
