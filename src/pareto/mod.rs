//! Multi-objective Pareto optimizer: generates named candidate sizings,
//! scores them across five objectives, and ranks them by non-dominated
//! sort + crowding distance.

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::{Objective, ObjectiveScore, Profile, Solution};

/// Aggregate per-workload usage statistics feeding candidate generation.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadMetrics {
    pub current_cpu_millicores: f64,
    pub avg_cpu_millicores: f64,
    pub peak_cpu_millicores: f64,
    pub p95_cpu_millicores: f64,
    pub p99_cpu_millicores: f64,
    pub current_mem_bytes: f64,
    pub avg_mem_bytes: f64,
    pub peak_mem_bytes: f64,
    pub p95_mem_bytes: f64,
    pub p99_mem_bytes: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    pub cpu_cost_per_core_hour: f64,
    pub mem_cost_per_gb_hour: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cpu_cost_per_core_hour: 0.03,
            mem_cost_per_gb_hour: 0.004,
        }
    }
}

const MEGABYTE: f64 = 1_048_576.0;

fn candidate_specs(metrics: &WorkloadMetrics) -> Vec<(&'static str, f64, f64)> {
    vec![
        ("conservative", metrics.p99_cpu_millicores * 1.2, metrics.p99_mem_bytes * 1.2),
        ("balanced", metrics.p95_cpu_millicores * 1.1, metrics.p95_mem_bytes * 1.1),
        ("aggressive", metrics.p95_cpu_millicores, metrics.p95_mem_bytes),
        ("cost-optimized", metrics.avg_cpu_millicores * 1.3, metrics.avg_mem_bytes * 1.3),
        ("performance", metrics.peak_cpu_millicores * 1.25, metrics.peak_mem_bytes * 1.25),
        ("current", metrics.current_cpu_millicores, metrics.current_mem_bytes),
    ]
}

fn change_percent(current: f64, candidate_cpu: f64, candidate_mem: f64, current_mem: f64) -> f64 {
    let cpu_delta = if current.abs() > f64::EPSILON {
        ((candidate_cpu - current) / current).abs()
    } else {
        0.0
    };
    let mem_delta = if current_mem.abs() > f64::EPSILON {
        ((candidate_mem - current_mem) / current_mem).abs()
    } else {
        0.0
    };
    cpu_delta.max(mem_delta) * 100.0
}

/// Build the six named candidates with limits = 1.5x request (CPU) and
/// 1.2x request (memory), and raw (un-normalized) objective values.
pub fn generate_candidates(metrics: &WorkloadMetrics, cost: CostModel) -> Vec<Solution> {
    candidate_specs(metrics)
        .into_iter()
        .map(|(label, cpu_request, mem_request)| {
            let cpu_request = cpu_request.max(0.0);
            let mem_request = mem_request.max(0.0);
            let cpu_limit = cpu_request * 1.5;
            let mem_limit = mem_request * 1.2;

            let cores = cpu_request / 1000.0;
            let gb = mem_request / 1024.0 / 1024.0 / 1024.0;
            let hourly_cost = cores * cost.cpu_cost_per_core_hour + gb * cost.mem_cost_per_gb_hour;

            let cpu_headroom = if cpu_request.abs() > f64::EPSILON {
                ((cpu_request - metrics.avg_cpu_millicores) / cpu_request).max(0.0)
            } else {
                0.0
            };
            let mem_headroom = if mem_request.abs() > f64::EPSILON {
                ((mem_request - metrics.avg_mem_bytes) / mem_request).max(0.0)
            } else {
                0.0
            };
            let performance = (cpu_headroom + mem_headroom) / 2.0;

            let cpu_reliability = if metrics.peak_cpu_millicores.abs() > f64::EPSILON {
                ((cpu_request - metrics.peak_cpu_millicores) / metrics.peak_cpu_millicores).max(0.0)
            } else {
                0.0
            };
            let mem_reliability = if metrics.peak_mem_bytes.abs() > f64::EPSILON {
                ((mem_request - metrics.peak_mem_bytes) / metrics.peak_mem_bytes).max(0.0)
            } else {
                0.0
            };
            let reliability = cpu_reliability.min(mem_reliability);

            let cpu_eff = if cpu_request.abs() > f64::EPSILON { metrics.avg_cpu_millicores / cpu_request } else { 0.0 };
            let mem_eff = if mem_request.abs() > f64::EPSILON { metrics.avg_mem_bytes / mem_request } else { 0.0 };
            let efficiency = (cpu_eff + mem_eff) / 2.0;

            let change_pct = change_percent(
                metrics.current_cpu_millicores,
                cpu_request,
                mem_request,
                metrics.current_mem_bytes,
            );
            let stability = (metrics.confidence - (change_pct / 100.0).min(1.0) * 50.0).max(0.0);

            let mut objectives = HashMap::new();
            objectives.insert(
                Objective::Cost,
                ObjectiveScore { value: hourly_cost, weight: Objective::Cost.default_weight(), minimize: true, normalized: 0.0 },
            );
            objectives.insert(
                Objective::Performance,
                ObjectiveScore { value: performance, weight: Objective::Performance.default_weight(), minimize: false, normalized: 0.0 },
            );
            objectives.insert(
                Objective::Reliability,
                ObjectiveScore { value: reliability, weight: Objective::Reliability.default_weight(), minimize: false, normalized: 0.0 },
            );
            objectives.insert(
                Objective::Efficiency,
                ObjectiveScore { value: efficiency, weight: Objective::Efficiency.default_weight(), minimize: false, normalized: 0.0 },
            );
            objectives.insert(
                Objective::Stability,
                ObjectiveScore { value: stability, weight: Objective::Stability.default_weight(), minimize: false, normalized: 0.0 },
            );

            Solution {
                id: Uuid::new_v4().to_string(),
                label: label.to_string(),
                cpu_request_millicores: cpu_request,
                mem_request_bytes: mem_request,
                cpu_limit_millicores: cpu_limit,
                mem_limit_bytes: mem_limit,
                objectives,
                dominated_by: Vec::new(),
                dominates: Vec::new(),
                pareto_rank: 0,
                crowding_distance: 0.0,
                overall_score: 0.0,
            }
        })
        .collect()
}

/// Normalize each objective to [0,1] across `candidates`, orienting so
/// that higher-normalized is always "better" regardless of minimize
/// polarity.
pub fn normalize(candidates: &mut [Solution]) {
    for objective in Objective::ALL {
        let values: Vec<f64> = candidates
            .iter()
            .filter_map(|c| c.objectives.get(&objective).map(|o| o.value))
            .collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        for candidate in candidates.iter_mut() {
            if let Some(score) = candidate.objectives.get_mut(&objective) {
                let raw_normalized = if range.abs() < f64::EPSILON {
                    1.0
                } else {
                    (score.value - min) / range
                };
                score.normalized = if score.minimize { 1.0 - raw_normalized } else { raw_normalized };
            }
        }
    }
}

/// Assign Pareto ranks: rank 0 is the non-dominated frontier, remove it,
/// repeat on the remainder until empty.
pub fn non_dominated_sort(candidates: &mut [Solution]) {
    let n = candidates.len();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut rank = 0usize;

    while !remaining.is_empty() {
        let mut frontier = Vec::new();
        for &i in &remaining {
            let dominated = remaining.iter().any(|&j| {
                j != i && candidates[j].dominates(&candidates[i])
            });
            if !dominated {
                frontier.push(i);
            }
        }
        if frontier.is_empty() {
            // Degenerate cycle guard: assign the rest the current rank.
            frontier = remaining.clone();
        }
        for &i in &frontier {
            candidates[i].pareto_rank = rank;
        }
        remaining.retain(|i| !frontier.contains(i));
        rank += 1;
    }

    for i in 0..n {
        let (dominates, dominated_by): (Vec<String>, Vec<String>) = {
            let mut dominates = Vec::new();
            let mut dominated_by = Vec::new();
            for j in 0..n {
                if i == j {
                    continue;
                }
                if candidates[i].dominates(&candidates[j]) {
                    dominates.push(candidates[j].id.clone());
                } else if candidates[j].dominates(&candidates[i]) {
                    dominated_by.push(candidates[j].id.clone());
                }
            }
            (dominates, dominated_by)
        };
        candidates[i].dominates = dominates;
        candidates[i].dominated_by = dominated_by;
    }
}

/// Crowding distance within each Pareto rank: boundary points get
/// infinity, interior points accumulate `(next-prev)/range` per objective.
pub fn crowding_distance(candidates: &mut [Solution]) {
    let max_rank = candidates.iter().map(|c| c.pareto_rank).max().unwrap_or(0);
    for rank in 0..=max_rank {
        let mut indices: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.pareto_rank == rank)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        for &i in &indices {
            candidates[i].crowding_distance = 0.0;
        }
        if indices.len() <= 2 {
            for &i in &indices {
                candidates[i].crowding_distance = f64::INFINITY;
            }
            continue;
        }
        for objective in Objective::ALL {
            indices.sort_by(|&a, &b| {
                let va = candidates[a].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
                let vb = candidates[b].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
                va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
            });
            let first = indices[0];
            let last = indices[indices.len() - 1];
            candidates[first].crowding_distance = f64::INFINITY;
            candidates[last].crowding_distance = f64::INFINITY;

            let min = candidates[first].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
            let max = candidates[last].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
            let range = max - min;
            if range.abs() < f64::EPSILON {
                continue;
            }
            for w in 1..indices.len() - 1 {
                let idx = indices[w];
                if candidates[idx].crowding_distance.is_infinite() {
                    continue;
                }
                let next = candidates[indices[w + 1]].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
                let prev = candidates[indices[w - 1]].objectives.get(&objective).map(|o| o.normalized).unwrap_or(0.0);
                candidates[idx].crowding_distance += (next - prev) / range;
            }
        }
    }
}

/// Weighted overall score = sum(normalized * weight) / sum(weight).
pub fn score_overall(candidates: &mut [Solution]) {
    for candidate in candidates.iter_mut() {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for score in candidate.objectives.values() {
            weighted_sum += score.normalized * score.weight;
            weight_sum += score.weight;
        }
        candidate.overall_score = if weight_sum.abs() > f64::EPSILON { weighted_sum / weight_sum } else { 0.0 };
    }
}

/// Select a candidate from the full evaluated set according to profile.
pub fn select_for_profile<'a>(candidates: &'a [Solution], profile: Profile) -> Option<&'a Solution> {
    match profile {
        Profile::Production => candidates.iter().max_by(|a, b| {
            let av = a.objectives.get(&Objective::Reliability).map(|o| o.value).unwrap_or(0.0);
            let bv = b.objectives.get(&Objective::Reliability).map(|o| o.value).unwrap_or(0.0);
            av.partial_cmp(&bv).unwrap_or(std::cmp::Ordering::Equal)
        }),
        Profile::Development => candidates.iter().min_by(|a, b| {
            let av = a.objectives.get(&Objective::Cost).map(|o| o.value).unwrap_or(f64::INFINITY);
            let bv = b.objectives.get(&Objective::Cost).map(|o| o.value).unwrap_or(f64::INFINITY);
            av.partial_cmp(&bv).unwrap_or(std::cmp::Ordering::Equal)
        }),
        Profile::Staging | Profile::Test | Profile::Custom => candidates.iter().max_by(|a, b| {
            a.overall_score.partial_cmp(&b.overall_score).unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}

#[derive(Debug, Clone)]
pub struct TradeoffEntry {
    pub from_label: String,
    pub to_label: String,
    pub objective: Objective,
    pub delta: f64,
}

/// Pairwise per-objective deltas between the Pareto-rank-0 frontier
/// members.
pub fn tradeoff_report(candidates: &[Solution]) -> Vec<TradeoffEntry> {
    let frontier: Vec<&Solution> = candidates.iter().filter(|c| c.pareto_rank == 0).collect();
    let mut entries = Vec::new();
    for i in 0..frontier.len() {
        for j in (i + 1)..frontier.len() {
            for objective in Objective::ALL {
                let a = frontier[i].objectives.get(&objective).map(|o| o.value).unwrap_or(0.0);
                let b = frontier[j].objectives.get(&objective).map(|o| o.value).unwrap_or(0.0);
                entries.push(TradeoffEntry {
                    from_label: frontier[i].label.clone(),
                    to_label: frontier[j].label.clone(),
                    objective,
                    delta: b - a,
                });
            }
        }
    }
    entries
}

/// Run the full pipeline: generate, normalize, rank, crowd, score.
pub fn optimize(metrics: &WorkloadMetrics, cost: CostModel) -> Vec<Solution> {
    let mut candidates = generate_candidates(metrics, cost);
    normalize(&mut candidates);
    non_dominated_sort(&mut candidates);
    crowding_distance(&mut candidates);
    score_overall(&mut candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics() -> WorkloadMetrics {
        WorkloadMetrics {
            current_cpu_millicores: 500.0,
            avg_cpu_millicores: 300.0,
            peak_cpu_millicores: 600.0,
            p95_cpu_millicores: 550.0,
            p99_cpu_millicores: 580.0,
            current_mem_bytes: 512.0 * MEGABYTE,
            avg_mem_bytes: 300.0 * MEGABYTE,
            peak_mem_bytes: 600.0 * MEGABYTE,
            p95_mem_bytes: 550.0 * MEGABYTE,
            p99_mem_bytes: 580.0 * MEGABYTE,
            confidence: 80.0,
        }
    }

    #[test]
    fn generates_six_named_candidates() {
        let candidates = generate_candidates(&sample_metrics(), CostModel::default());
        assert_eq!(candidates.len(), 6);
        let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert!(labels.contains(&"conservative"));
        assert!(labels.contains(&"current"));
    }

    #[test]
    fn limits_follow_request_multipliers() {
        let candidates = generate_candidates(&sample_metrics(), CostModel::default());
        for c in &candidates {
            assert!((c.cpu_limit_millicores - c.cpu_request_millicores * 1.5).abs() < 1e-6);
            assert!((c.mem_limit_bytes - c.mem_request_bytes * 1.2).abs() < 1e-6);
        }
    }

    #[test]
    fn frontier_is_non_empty_and_ranked() {
        let candidates = optimize(&sample_metrics(), CostModel::default());
        assert!(candidates.iter().any(|c| c.pareto_rank == 0));
        assert!(candidates.iter().all(|c| c.overall_score.is_finite()));
    }

    #[test]
    fn production_profile_prefers_highest_reliability() {
        let candidates = optimize(&sample_metrics(), CostModel::default());
        let selected = select_for_profile(&candidates, Profile::Production).unwrap();
        let best_reliability = candidates
            .iter()
            .map(|c| c.objectives.get(&Objective::Reliability).unwrap().value)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((selected.objectives.get(&Objective::Reliability).unwrap().value - best_reliability).abs() < 1e-9);
    }

    #[test]
    fn development_profile_prefers_lowest_cost() {
        let candidates = optimize(&sample_metrics(), CostModel::default());
        let selected = select_for_profile(&candidates, Profile::Development).unwrap();
        let lowest_cost = candidates
            .iter()
            .map(|c| c.objectives.get(&Objective::Cost).unwrap().value)
            .fold(f64::INFINITY, f64::min);
        assert!((selected.objectives.get(&Objective::Cost).unwrap().value - lowest_cost).abs() < 1e-9);
    }
}
