//! SLA Health: rolling-window violation checks against a tenant's
//! `SlaDefinition`s, health-score computation, and pre/post-optimization
//! impact comparison used by the safety pipeline.

pub mod control_chart;

use chrono::{DateTime, Utc};

use crate::stats;
use crate::types::{LatencyAggregation, SlaDefinition, SlaMetricKind};

/// One observed value of a named metric at a point in time. `name` must
/// match `SlaDefinition::name` for custom metrics; for the built-in kinds
/// (latency/error-rate/availability/throughput) the metric is looked up by
/// kind instead.
#[derive(Debug, Clone, Copy)]
pub struct MetricObservation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct SlaViolation {
    pub name: String,
    pub kind: SlaMetricKind,
    pub actual: f64,
    pub threshold: f64,
    pub severity: f64,
}

#[derive(Debug, Clone)]
pub struct SlaReport {
    pub health_score: f64,
    pub violations: Vec<SlaViolation>,
}

fn aggregate(values: &[f64], aggregation: Option<LatencyAggregation>) -> f64 {
    match aggregation {
        Some(LatencyAggregation::P50) => stats::percentile(values, 50.0),
        Some(LatencyAggregation::P90) => stats::percentile(values, 90.0),
        Some(LatencyAggregation::P95) => stats::percentile(values, 95.0),
        Some(LatencyAggregation::P99) => stats::percentile(values, 99.0),
        Some(LatencyAggregation::Mean) | None => stats::mean(values),
    }
}

fn severity(actual: f64, threshold: f64, minimize: bool) -> f64 {
    if threshold.abs() < f64::EPSILON {
        return 0.0;
    }
    let raw = if minimize {
        (actual - threshold) / threshold
    } else {
        (threshold - actual) / threshold
    };
    raw.clamp(0.0, 1.0)
}

fn is_violating(actual: f64, threshold: f64, minimize: bool) -> bool {
    if minimize {
        actual > threshold
    } else {
        actual < threshold
    }
}

/// Evaluate every `SlaDefinition` against the observations windowed to
/// `definition.window_minutes` ending at `now`. `observations_by_name`
/// looks up the series for a given definition name.
pub fn check_sla(
    definitions: &[SlaDefinition],
    observations_by_name: impl Fn(&str) -> Vec<MetricObservation>,
    now: DateTime<Utc>,
) -> SlaReport {
    let mut violations = Vec::new();

    for def in definitions {
        let window_start = now - chrono::Duration::minutes(i64::from(def.window_minutes));
        let series: Vec<f64> = observations_by_name(&def.name)
            .into_iter()
            .filter(|o| o.timestamp >= window_start && o.timestamp <= now)
            .map(|o| o.value)
            .collect();
        if series.is_empty() {
            continue;
        }

        let actual = if def.kind == SlaMetricKind::Latency {
            aggregate(&series, def.latency_aggregation)
        } else {
            stats::mean(&series)
        };

        if is_violating(actual, def.threshold, def.minimize) {
            violations.push(SlaViolation {
                name: def.name.clone(),
                kind: def.kind,
                actual,
                threshold: def.threshold,
                severity: severity(actual, def.threshold, def.minimize),
            });
        }
    }

    let health_score = health_score(&violations, 0);

    SlaReport {
        health_score,
        violations,
    }
}

/// Health score starting at 100: subtract `max(severity*35, 15)` per
/// violation and 2 per detected control-chart outlier, clamped to [0,100].
pub fn health_score(violations: &[SlaViolation], outlier_count: usize) -> f64 {
    let mut score = 100.0;
    for v in violations {
        score -= (v.severity * 35.0).max(15.0);
    }
    score -= 2.0 * outlier_count as f64;
    score.clamp(0.0, 100.0)
}

/// Block condition for the safety pipeline's pre-opt SLA gate.
pub fn should_block(report: &SlaReport) -> bool {
    report.health_score < 70.0 || report.violations.iter().any(|v| v.severity > 0.8)
}

/// Default settle period (§4.9 step 8) between a live apply and the
/// post-opt SLA re-check.
pub const DEFAULT_SETTLE_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy)]
pub struct PostOptComparison {
    pub impact_score: f64,
    pub new_violation_count: usize,
    pub rollback_recommended: bool,
}

/// Compare pre-opt and post-opt SLA reports after the settle period.
/// Impact score is the health-score delta normalized to [-1,1] via /100.
pub fn compare_post_opt(pre: &SlaReport, post: &SlaReport) -> PostOptComparison {
    let impact_score = (post.health_score - pre.health_score) / 100.0;
    let pre_names: std::collections::HashSet<&str> = pre.violations.iter().map(|v| v.name.as_str()).collect();
    let new_violations: Vec<&SlaViolation> = post
        .violations
        .iter()
        .filter(|v| !pre_names.contains(v.name.as_str()))
        .collect();
    let has_severe_new = post.violations.iter().any(|v| v.severity >= 0.8) && impact_score < 0.0;
    let rollback_recommended = impact_score < -0.15 || has_severe_new || new_violations.len() >= 3;

    PostOptComparison {
        impact_score,
        new_violation_count: new_violations.len(),
        rollback_recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn def(name: &str, kind: SlaMetricKind, threshold: f64, minimize: bool) -> SlaDefinition {
        SlaDefinition {
            name: name.to_string(),
            kind,
            threshold,
            window_minutes: 60,
            latency_aggregation: Some(LatencyAggregation::P95),
            minimize,
        }
    }

    #[test]
    fn healthy_series_has_no_violations() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let definitions = vec![def("latency", SlaMetricKind::Latency, 500.0, true)];
        let obs = |_: &str| {
            (0..30)
                .map(|i| MetricObservation {
                    timestamp: now - chrono::Duration::minutes(i),
                    value: 100.0,
                })
                .collect()
        };
        let report = check_sla(&definitions, obs, now);
        assert!(report.violations.is_empty());
        assert_eq!(report.health_score, 100.0);
        assert!(!should_block(&report));
    }

    #[test]
    fn severe_violation_blocks() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let definitions = vec![def("latency", SlaMetricKind::Latency, 100.0, true)];
        let obs = |_: &str| {
            (0..30)
                .map(|i| MetricObservation {
                    timestamp: now - chrono::Duration::minutes(i),
                    value: 1000.0,
                })
                .collect()
        };
        let report = check_sla(&definitions, obs, now);
        assert!(!report.violations.is_empty());
        assert!(should_block(&report));
    }

    #[test]
    fn post_opt_regression_recommends_rollback() {
        let pre = SlaReport {
            health_score: 95.0,
            violations: vec![],
        };
        let post = SlaReport {
            health_score: 50.0,
            violations: vec![
                SlaViolation { name: "a".into(), kind: SlaMetricKind::Latency, actual: 1.0, threshold: 1.0, severity: 0.9 },
            ],
        };
        let cmp = compare_post_opt(&pre, &post);
        assert!(cmp.rollback_recommended);
        assert!(cmp.impact_score < 0.0);
    }
}
