//! Top-level reconcile orchestration: the one place that composes the
//! sample store, recommendation engine, anomaly/SLA gates, safety
//! pipeline, and the external collaborator traits into a single
//! per-workload decision. Everything downstream of this module is either
//! a pure function or a named interface the caller supplies.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::anomaly::workload_gate::{check_workload_anomalies, WorkloadAnomalyReport};
use crate::anomaly::ConsensusConfig;
use crate::events::{EventRecorder, EventReason, ObjectRef};
use crate::external::{ApplyStrategy, FieldChange, MetricSource, MutateError, WorkloadMutator};
use crate::forecast::decompose::{detect_seasonal_period, SeasonalityType};
use crate::forecast::holt_winters::{self, HoltWintersParams};
use crate::gitops::{self, AcceptedRecommendation};
use crate::metrics::Metrics;
use crate::oom::OomHistoryStore;
use crate::pareto::{self, CostModel, WorkloadMetrics};
use crate::patterns::{self, PatternConfig, PatternType};
use crate::profile::{self, ResolvedSettings};
use crate::recommend;
use crate::safety::autoscaler::{self, AutoscalerDecision, ExternalAutoscaler};
use crate::safety::disruption_budget::{BudgetLimit, DisruptionCheck};
use crate::safety::{self, BlockReason, SafetyDecision, SafetyInputs};
use crate::sla::{self, MetricObservation, SlaReport};
use crate::reconcile::ReconcileResult;
use crate::stats;
use crate::store::SampleStore;
use crate::types::{
    CircuitState, CircuitStateKind, Config, ParetoAdvisory, ScheduleAdvisory, Sample, Status, WorkloadKey, WorkloadRecommendation,
};

/// Facts about a workload that only the caller's cluster client can know:
/// replica counts for the disruption-budget check and any externally
/// discovered autoscalers targeting it. Usage samples and current
/// requests are read from the sample store instead, since those are
/// ingested independently of a single reconcile.
#[derive(Debug, Clone)]
pub struct WorkloadContext {
    pub workload: WorkloadKey,
    pub total_replicas: u32,
    pub available_replicas: u32,
    pub current_unavailable: u32,
    pub disruption_limit: Option<BudgetLimit>,
    pub autoscalers: Vec<ExternalAutoscaler>,
}

/// How one workload's reconcile attempt concluded, for logging/events and
/// for the caller to decide whether to count it as a circuit-breaker
/// success or failure.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// No recommendation was produced (insufficient samples, or current
    /// request already within 1% of the computed size).
    NoRecommendation,
    /// A recommendation was computed but a safety gate blocked it.
    Blocked { reason: BlockReason, recommendation: WorkloadRecommendation },
    /// Applied live (or simulated, under `dry_run`). `rollback_recommended`
    /// is set when the post-opt SLA re-check (§4.9 step 8) found a
    /// regression; it is never set for a dry-run, since nothing was
    /// actually mutated to re-check.
    Applied { recommendation: WorkloadRecommendation, strategy: ApplyStrategy, changes: Vec<FieldChange>, rollback_recommended: bool },
    /// The mutator call itself failed.
    MutateFailed { recommendation: WorkloadRecommendation, error: MutateError },
    /// Rendered to the GitOps sink instead of applied live (§4.14,
    /// `config.gitops.enabled`).
    Exported { recommendation: WorkloadRecommendation, paths: Vec<std::path::PathBuf> },
    /// Rendering or writing the GitOps bundle failed.
    ExportFailed { recommendation: WorkloadRecommendation, error: String },
}

impl ReconcileOutcome {
    /// Whether this outcome should count as a circuit-breaker success.
    /// Safety blocks are policy decisions, not errors, and a missing
    /// recommendation isn't an attempt at all — only a completed mutator
    /// call or GitOps export can fail.
    pub fn is_circuit_failure(&self) -> bool {
        matches!(self, ReconcileOutcome::MutateFailed { .. } | ReconcileOutcome::ExportFailed { .. })
    }
}

/// Everything one workload reconcile needs beyond the `Config`/`Status`
/// pair: the shared stores and the external collaborators. Cloned cheaply
/// per tick since every field is an `Arc`.
#[derive(Clone)]
pub struct ReconcileDeps {
    pub sample_store: Arc<SampleStore>,
    pub oom_history: Arc<OomHistoryStore>,
    pub mutator: Arc<dyn WorkloadMutator>,
    pub metric_source: Arc<dyn MetricSource>,
    pub events: Arc<dyn EventRecorder>,
    pub metrics: Arc<Metrics>,
}

fn resolved_settings(config: &Config) -> ResolvedSettings {
    profile::resolve(config.profile, config.profile_overrides.as_ref(), config.dry_run)
}

/// Run the Pareto optimizer (§4.6) over the workload's total resource
/// footprint (sum across containers) and select a candidate per the
/// tenant's profile, attaching a summary to the recommendation for
/// GitOps rationale. Advisory only — never blocks the safety pipeline,
/// which acts on the per-container sizing already computed. Summing
/// across containers (rather than the spec's noted first-container-only
/// behavior, see §9 Open Questions) is an explicit choice: a workload's
/// cost/headroom trade-off is a property of its total footprint.
fn pareto_advisory(recommendation: &WorkloadRecommendation, config: &Config, samples: &[Sample]) -> Option<ParetoAdvisory> {
    if samples.is_empty() {
        return None;
    }
    let totals_cpu: Vec<f64> = samples.iter().map(|s| s.containers.iter().map(|c| c.cpu_millicores).sum()).collect();
    let totals_mem: Vec<f64> = samples.iter().map(|s| s.containers.iter().map(|c| c.memory_bytes).sum()).collect();
    let confidence = recommendation.containers.iter().map(|c| c.confidence).fold(f64::INFINITY, f64::min);
    if !confidence.is_finite() {
        return None;
    }
    let metrics = WorkloadMetrics {
        current_cpu_millicores: totals_cpu.last().copied().unwrap_or(0.0),
        avg_cpu_millicores: stats::mean(&totals_cpu),
        peak_cpu_millicores: stats::max(&totals_cpu),
        p95_cpu_millicores: stats::percentile(&totals_cpu, 95.0),
        p99_cpu_millicores: stats::percentile(&totals_cpu, 99.0),
        current_mem_bytes: totals_mem.last().copied().unwrap_or(0.0),
        avg_mem_bytes: stats::mean(&totals_mem),
        peak_mem_bytes: stats::max(&totals_mem),
        p95_mem_bytes: stats::percentile(&totals_mem, 95.0),
        p99_mem_bytes: stats::percentile(&totals_mem, 99.0),
        confidence,
    };
    let candidates = pareto::optimize(&metrics, CostModel::default());
    let selected = pareto::select_for_profile(&candidates, config.profile)?;
    let frontier_size = candidates.iter().filter(|c| c.pareto_rank == 0).count();
    Some(ParetoAdvisory {
        selected_label: selected.label.clone(),
        overall_score: selected.overall_score,
        pareto_rank: selected.pareto_rank,
        frontier_size,
    })
}

/// Run the time-pattern analyzer (§4.5) for scheduled-scaling hints when
/// the workload has enough history to classify a pattern. Advisory only,
/// surfaced alongside the Pareto summary.
fn schedule_advisory(samples: &[Sample]) -> Option<ScheduleAdvisory> {
    if samples.len() < 24 {
        return None;
    }
    let earliest = samples.iter().map(|s| s.timestamp).min()?;
    let latest = samples.iter().map(|s| s.timestamp).max()?;
    if latest.signed_duration_since(earliest) < chrono::Duration::days(2) {
        return None;
    }
    let report = patterns::analyze(samples, PatternConfig::default());
    if report.pattern == PatternType::NoPattern {
        return None;
    }
    let schedule = report.schedule?;
    Some(ScheduleAdvisory {
        pattern: format!("{:?}", report.pattern),
        estimated_savings_percent: schedule.estimated_savings_percent,
        schedule_entry_count: schedule.entries.len(),
        forecast_next_period_cpu_millicores: forecast_next_period_cpu(samples),
    })
}

/// Aggregate samples into one total-CPU point per calendar day, then fit
/// a Holt-Winters model over the detected seasonal period and forecast
/// one step ahead (§4.4). Returns `None` when the daily series is too
/// short to detect a period or to satisfy the fitter's minimum-data rule.
fn forecast_next_period_cpu(samples: &[Sample]) -> Option<f64> {
    let mut by_day: std::collections::BTreeMap<chrono::NaiveDate, Vec<f64>> = std::collections::BTreeMap::new();
    for sample in samples {
        let total: f64 = sample.containers.iter().map(|c| c.cpu_millicores).sum();
        by_day.entry(sample.timestamp.date_naive()).or_default().push(total);
    }
    let daily: Vec<f64> = by_day.into_values().map(|values| stats::mean(&values)).collect();
    let period = detect_seasonal_period(&daily, 14)?;
    if period < 2 || daily.len() < 2 * period {
        return None;
    }
    let params = HoltWintersParams::new(period, SeasonalityType::Additive);
    let fit = holt_winters::fit(&daily, params).ok()?;
    holt_winters::forecast(&fit, 1, 1.96).into_iter().next().map(|point| point.value)
}

fn sla_report(config: &Config, deps: &ReconcileDeps, workload: &WorkloadKey, now: DateTime<Utc>) -> SlaReport {
    if config.sla_definitions.is_empty() {
        return SlaReport { health_score: 100.0, violations: vec![] };
    }
    let observations_by_name = |name: &str| -> Vec<MetricObservation> {
        deps.metric_source
            .get_metrics(&workload.namespace, &workload.name, Duration::from_secs(3600), now)
            .into_iter()
            .filter(|_| !name.is_empty())
            .collect()
    };
    sla::check_sla(&config.sla_definitions, observations_by_name, now)
}

/// Reconcile a single workload: build its recommendation from recently
/// ingested samples, gate it through the anomaly/SLA/safety pipeline, and
/// (if clear) hand it to the `WorkloadMutator`. Returns the outcome and
/// the circuit state the caller should record the attempt against —
/// callers fold `record_outcome` themselves since the circuit is shared
/// across a tenant's whole `Config`, not one workload.
pub async fn reconcile_workload(
    config: &Config,
    ctx: &WorkloadContext,
    circuit_state: &CircuitState,
    deps: &ReconcileDeps,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let settings = resolved_settings(config);
    let window = Duration::from_secs(u64::from(settings.knobs.history_window_hours) * 3600);
    let samples = deps.sample_store.get_by_workload_as_of(&ctx.workload, window, now);

    let object = ObjectRef { namespace: ctx.workload.namespace.clone(), name: ctx.workload.name.clone() };

    let containers = recommend::container_series(&samples);
    let mut container_recs = Vec::new();
    for (container, (cpu_series, mem_series)) in &containers {
        let current_cpu = cpu_series.last().copied().unwrap_or(0.0);
        let current_mem = mem_series.last().copied().unwrap_or(0.0);
        let oom = deps.oom_history.get(&ctx.workload, container);
        if let Some(rec) = recommend::recommend_container(container, cpu_series, mem_series, current_cpu, current_mem, oom, &settings.knobs) {
            container_recs.push(rec);
        }
    }

    let Some(mut recommendation) = recommend::build_workload_recommendation(ctx.workload.clone(), container_recs) else {
        return ReconcileOutcome::NoRecommendation;
    };
    recommendation.pareto = pareto_advisory(&recommendation, config, &samples);
    recommendation.schedule = schedule_advisory(&samples);

    let anomaly_report = check_workload_anomalies(&samples, ConsensusConfig::default(), crate::anomaly::workload_gate::DEFAULT_MIN_BLOCKING_COUNT);
    let pre_opt_sla = sla_report(config, deps, &ctx.workload, now);
    let disruption_check = ctx.disruption_limit.map(|_| DisruptionCheck {
        total_replicas: ctx.total_replicas,
        available_replicas: ctx.available_replicas,
        current_unavailable: ctx.current_unavailable,
    });

    let confidence = recommendation.containers.iter().map(|c| c.confidence).fold(f64::INFINITY, f64::min);
    let change_percent = recommendation
        .containers
        .iter()
        .map(|c| c.change_percent)
        .fold(0.0_f64, f64::max);

    let decision = safety::evaluate(&SafetyInputs {
        pre_opt_sla: &pre_opt_sla,
        autoscalers: &ctx.autoscalers,
        autoscaler_awareness: &config.autoscaler_awareness,
        disruption_check,
        disruption_limit: ctx.disruption_limit,
        anomaly_report: &anomaly_report,
        circuit_state,
        circuit_config: &config.circuit_breaker,
        maintenance_windows: &config.maintenance_windows,
        resolved_settings: &settings,
        confidence,
        change_percent,
        now,
    });

    record_safety_telemetry(deps, &anomaly_report, &decision);

    match decision {
        SafetyDecision::Blocked { reason, .. } => {
            warn!(workload = %ctx.workload.queue_key(), ?reason, "recommendation blocked by safety pipeline");
            deps.events.record_warning(&object, reason_to_event(&reason), &format!("{reason:?}"));
            ReconcileOutcome::Blocked { reason, recommendation }
        }
        SafetyDecision::Proceed { autoscaler_warning } => {
            if autoscaler_warning {
                deps.events.record_warning(&object, EventReason::HpaConflictDetected, "external autoscaler targets this workload");
            }
            apply_recommendation(config, ctx, recommendation, &object, deps, &pre_opt_sla, now).await
        }
    }
}

fn record_safety_telemetry(deps: &ReconcileDeps, anomaly_report: &WorkloadAnomalyReport, decision: &SafetyDecision) {
    if anomaly_report.should_block_scaling {
        deps.metrics.record_safety_block("anomaly");
    }
    if let SafetyDecision::Blocked { reason, .. } = decision {
        deps.metrics.record_safety_block(block_reason_label(reason));
    }
}

fn block_reason_label(reason: &BlockReason) -> &'static str {
    match reason {
        BlockReason::PreOptSla { .. } => "pre_opt_sla",
        BlockReason::AutoscalerConflict => "autoscaler_conflict",
        BlockReason::DisruptionBudget => "disruption_budget",
        BlockReason::Anomaly => "anomaly",
        BlockReason::CircuitOpen => "circuit_open",
        BlockReason::OutsideMaintenanceWindow => "outside_maintenance_window",
        BlockReason::ShouldApply(_) => "should_apply",
    }
}

fn reason_to_event(reason: &BlockReason) -> EventReason {
    match reason {
        BlockReason::PreOptSla { .. } => EventReason::SlaViolation,
        BlockReason::AutoscalerConflict => EventReason::HpaConflictDetected,
        BlockReason::DisruptionBudget => EventReason::PdbViolation,
        BlockReason::Anomaly => EventReason::AnomalyDetected,
        BlockReason::CircuitOpen => EventReason::CircuitBreakerOpen,
        BlockReason::OutsideMaintenanceWindow => EventReason::MaintenanceWindowSkipped,
        BlockReason::ShouldApply(_) => EventReason::ConfigInvalid,
    }
}

async fn apply_recommendation(
    config: &Config,
    ctx: &WorkloadContext,
    recommendation: WorkloadRecommendation,
    object: &ObjectRef,
    deps: &ReconcileDeps,
    pre_opt_sla: &SlaReport,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    if config.gitops.enabled {
        return export_recommendation(config, ctx, recommendation, object, deps);
    }

    match deps.mutator.apply(&ctx.workload, &recommendation, config.dry_run).await {
        Ok((strategy, changes)) => {
            deps.metrics.record_applied();
            let reason = if config.dry_run { EventReason::DryRunSimulated } else { EventReason::OptimizationApplied };
            info!(workload = %ctx.workload.queue_key(), dry_run = config.dry_run, containers = changes.len(), "recommendation applied");
            deps.events.record_normal(object, reason, &format!("{} container(s) resized", changes.len()));

            let rollback_recommended = if config.dry_run {
                false
            } else {
                post_opt_check(config, ctx, deps, object, pre_opt_sla, now).await
            };

            ReconcileOutcome::Applied { recommendation, strategy, changes, rollback_recommended }
        }
        Err(error) => {
            warn!(workload = %ctx.workload.queue_key(), %error, "workload mutator failed");
            deps.events.record_warning(object, EventReason::ReconcileFailed, &error.to_string());
            ReconcileOutcome::MutateFailed { recommendation, error }
        }
    }
}

/// §4.9 step 8: wait the settle period, re-run the SLA check, and flag a
/// rollback recommendation on regression. No rollback is performed here —
/// prior state is not persisted (§9) — this only detects and surfaces it.
async fn post_opt_check(
    config: &Config,
    ctx: &WorkloadContext,
    deps: &ReconcileDeps,
    object: &ObjectRef,
    pre_opt_sla: &SlaReport,
    now: DateTime<Utc>,
) -> bool {
    if config.sla_definitions.is_empty() {
        return false;
    }
    tokio::time::sleep(Duration::from_secs(sla::DEFAULT_SETTLE_SECONDS)).await;
    let settled_at = now + chrono::Duration::seconds(sla::DEFAULT_SETTLE_SECONDS as i64);
    let post_opt_sla = sla_report(config, deps, &ctx.workload, settled_at);
    let comparison = sla::compare_post_opt(pre_opt_sla, &post_opt_sla);
    if comparison.rollback_recommended {
        warn!(
            workload = %ctx.workload.queue_key(),
            impact_score = comparison.impact_score,
            new_violations = comparison.new_violation_count,
            "post-opt SLA regression, rollback recommended"
        );
        deps.events.record_warning(
            object,
            EventReason::RollbackRecommended,
            &format!("impact score {:.2}, {} new violation(s)", comparison.impact_score, comparison.new_violation_count),
        );
    }
    comparison.rollback_recommended
}

/// Build one [`AcceptedRecommendation`] per container, carrying the
/// Pareto advisory's label into the rationale string when one was
/// computed. Limits are only populated when `emit_limits` is set
/// (§4.14), sized at a 1.5x/1.2x multiple of the recommended request —
/// the same ratio the teacher's own `WellConfig` defaults apply between
/// target and ceiling bounds.
fn build_accepted(workload: &WorkloadKey, recommendation: &WorkloadRecommendation, emit_limits: bool) -> Vec<AcceptedRecommendation> {
    let pareto_label = recommendation.pareto.as_ref().map(|p| p.selected_label.as_str());
    recommendation
        .containers
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let (limit_cpu, limit_mem) = if emit_limits {
                (Some(c.recommended_cpu_millicores * 1.5), Some(c.recommended_memory_bytes * 1.2))
            } else {
                (None, None)
            };
            let rationale = match pareto_label {
                Some(label) => format!("p{:.0} percentile sizing, pareto candidate '{label}'", c.cpu_percentile),
                None => format!("p{:.0} percentile sizing", c.cpu_percentile),
            };
            AcceptedRecommendation {
                namespace: workload.namespace.clone(),
                kind: workload.kind.to_string(),
                name: workload.name.clone(),
                container: c.container.clone(),
                container_index: index,
                cpu_millicores: c.recommended_cpu_millicores,
                mem_bytes: c.recommended_memory_bytes,
                limit_cpu_millicores: limit_cpu,
                limit_mem_bytes: limit_mem,
                confidence: c.confidence,
                rationale,
            }
        })
        .collect()
}

/// Render the recommendation to the configured GitOps sink instead of
/// applying it live (§4.14). Each container is validated before
/// rendering; a single invalid container fails the whole export rather
/// than writing a partial bundle.
fn export_recommendation(
    config: &Config,
    ctx: &WorkloadContext,
    recommendation: WorkloadRecommendation,
    object: &ObjectRef,
    deps: &ReconcileDeps,
) -> ReconcileOutcome {
    let accepted = build_accepted(&ctx.workload, &recommendation, config.gitops.emit_limits);
    if let Some(error) = accepted.iter().find_map(|rec| gitops::validate(rec).err()) {
        warn!(workload = %ctx.workload.queue_key(), %error, "gitops recommendation failed validation");
        deps.events.record_warning(object, EventReason::GitOpsExportFailed, &error.to_string());
        return ReconcileOutcome::ExportFailed { recommendation, error: error.to_string() };
    }

    let output_dir = std::path::Path::new(&config.gitops.output_path);
    match gitops::write_bundle(config.gitops.format, output_dir, &accepted) {
        Ok(paths) => {
            deps.metrics.record_applied();
            info!(workload = %ctx.workload.queue_key(), files = paths.len(), "recommendation exported to gitops sink");
            deps.events.record_normal(object, EventReason::GitOpsExportSucceeded, &format!("{} file(s) written", paths.len()));
            ReconcileOutcome::Exported { recommendation, paths }
        }
        Err(error) => {
            warn!(workload = %ctx.workload.queue_key(), %error, "gitops bundle write failed");
            deps.events.record_warning(object, EventReason::GitOpsExportFailed, &error.to_string());
            ReconcileOutcome::ExportFailed { recommendation, error: error.to_string() }
        }
    }
}

/// Advance a tenant's `Config`/`Status` pair for one reconcile tick,
/// running every target workload in turn and folding their outcomes into
/// the shared circuit-breaker state before computing the next phase via
/// `reconcile::reconcile`. Returns the next `Status`, the phase's
/// requeue hint, and the outcome for each workload (same order as
/// `workloads`).
pub async fn reconcile_config(
    config: &Config,
    status: &Status,
    workloads: &[WorkloadContext],
    deps: &ReconcileDeps,
    now: DateTime<Utc>,
) -> (Status, ReconcileResult, Vec<(WorkloadKey, ReconcileOutcome)>) {
    deps.metrics.record_reconcile();

    let mut circuit_state = CircuitState {
        kind: status.circuit_state,
        consecutive_errors: status.consecutive_errors,
        consecutive_successes: status.consecutive_successes,
        last_transition: status.last_reconcile_time.unwrap_or(now),
    };

    let mut outcomes = Vec::with_capacity(workloads.len());
    for ctx in workloads {
        if let Some(decision) = autoscaler_skip_only(config, ctx) {
            outcomes.push((ctx.workload.clone(), decision));
            continue;
        }
        if !safety::circuit_breaker::permits(&circuit_state, &config.circuit_breaker, now) {
            continue;
        }
        let outcome = reconcile_workload(config, ctx, &circuit_state, deps, now).await;
        let was_failure = outcome.is_circuit_failure();
        if was_failure {
            deps.metrics.record_reconcile_error();
        }
        let previous_kind = circuit_state.kind;
        circuit_state = safety::circuit_breaker::record_outcome(&circuit_state, &config.circuit_breaker, !was_failure, now);
        if previous_kind != CircuitStateKind::Open && circuit_state.kind == CircuitStateKind::Open {
            deps.metrics.record_circuit_open();
            deps.events.record_warning(
                &ObjectRef { namespace: ctx.workload.namespace.clone(), name: ctx.workload.name.clone() },
                EventReason::CircuitBreakerOpen,
                "circuit opened after repeated mutator failures",
            );
        } else if previous_kind == CircuitStateKind::HalfOpen && circuit_state.kind == CircuitStateKind::Closed {
            deps.metrics.record_circuit_close();
        }
        outcomes.push((ctx.workload.clone(), outcome));
    }

    let (mut next_status, result) = crate::reconcile::reconcile(config, status, &circuit_state, now);
    for (_, outcome) in &outcomes {
        match outcome {
            ReconcileOutcome::Applied { .. } | ReconcileOutcome::Exported { .. } => next_status.total_applied += 1,
            ReconcileOutcome::Blocked { .. } => next_status.total_skipped += 1,
            ReconcileOutcome::MutateFailed { .. } | ReconcileOutcome::ExportFailed { .. } => next_status.total_failed += 1,
            ReconcileOutcome::NoRecommendation => {}
        }
    }

    (next_status, result, outcomes)
}

/// Conflict policies that reject outright (`Skip`) short-circuit before a
/// recommendation is even computed, since there is nothing to apply.
fn autoscaler_skip_only(config: &Config, ctx: &WorkloadContext) -> Option<ReconcileOutcome> {
    if autoscaler::check(&ctx.autoscalers, &config.autoscaler_awareness) == AutoscalerDecision::Skip {
        Some(ReconcileOutcome::Blocked {
            reason: BlockReason::AutoscalerConflict,
            recommendation: WorkloadRecommendation { workload: ctx.workload.clone(), containers: vec![], pareto: None, schedule: None },
        })
    } else {
        None
    }
}
