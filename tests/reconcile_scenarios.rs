//! Black-box integration tests driving `reconcile_config` end to end
//! through the public API: sample store -> recommendation engine ->
//! anomaly/safety pipeline -> mutator/GitOps sink. Complements the
//! per-module unit tests with cross-module scenarios from spec §8.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rightsizer::controller::{reconcile_config, ReconcileDeps, ReconcileOutcome, WorkloadContext};
use rightsizer::events::InMemoryEventRecorder;
use rightsizer::external::{ApplyStrategy, AlwaysHealthySource, FieldChange, MutateError, WorkloadMutator};
use rightsizer::metrics::Metrics;
use rightsizer::oom::OomHistoryStore;
use rightsizer::safety::disruption_budget::{BudgetLimit, ResourceAmount};
use rightsizer::safety::BlockReason;
use rightsizer::store::SampleStore;
use rightsizer::types::{
    AutoscalerAwareness, AutoscalerConflictPolicy, CircuitBreakerConfig, Config, ContainerSample,
    DisruptionBudgetAwareness, GitOpsExportConfig, Profile, Sample, Status, Strategy, WorkloadKey, WorkloadKind,
    WorkloadRecommendation,
};

struct AlwaysApplyMutator;

#[async_trait::async_trait]
impl WorkloadMutator for AlwaysApplyMutator {
    async fn apply(
        &self,
        _workload: &WorkloadKey,
        recommendation: &WorkloadRecommendation,
        _dry_run: bool,
    ) -> Result<(ApplyStrategy, Vec<FieldChange>), MutateError> {
        Ok((ApplyStrategy::InPlace, vec![FieldChange {
            container: recommendation.containers[0].container.clone(),
            field: "requests.cpu".to_string(),
            previous: "1000m".to_string(),
            new: "480m".to_string(),
        }]))
    }
}

fn base_config() -> Config {
    Config {
        name: "tenant-a".to_string(),
        enabled: true,
        target_namespaces: vec!["prod".to_string()],
        target_kinds: vec![WorkloadKind::Deployment],
        exclude_workloads: vec![],
        strategy: Strategy::Balanced,
        profile: Profile::Test,
        profile_overrides: None,
        dry_run: false,
        circuit_breaker: CircuitBreakerConfig::default(),
        autoscaler_awareness: AutoscalerAwareness { enabled: true, conflict_policy: AutoscalerConflictPolicy::Skip },
        disruption_budget_awareness: DisruptionBudgetAwareness::default(),
        maintenance_windows: vec![],
        gitops: GitOpsExportConfig::default(),
        sla_definitions: vec![],
        generation: 1,
    }
}

/// Returns the deps bundle plus a concrete handle to the in-memory event
/// recorder, since `ReconcileDeps::events` is type-erased to `Arc<dyn
/// EventRecorder>` and can't expose `InMemoryEventRecorder::events()`.
fn deps() -> (ReconcileDeps, Arc<InMemoryEventRecorder>) {
    let events = Arc::new(InMemoryEventRecorder::new());
    let reconcile_deps = ReconcileDeps {
        sample_store: Arc::new(SampleStore::default()),
        oom_history: Arc::new(OomHistoryStore::new()),
        mutator: Arc::new(AlwaysApplyMutator),
        metric_source: Arc::new(AlwaysHealthySource),
        events: events.clone(),
        metrics: Arc::new(Metrics::new()),
    };
    (reconcile_deps, events)
}

fn workload() -> WorkloadKey {
    WorkloadKey::new("prod", WorkloadKind::Deployment, "api")
}

fn flat_sample(ts: i64, cpu: f64) -> Sample {
    Sample {
        timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
        namespace: "prod".to_string(),
        pod: "api-7d4f8-x2z9k".to_string(),
        containers: vec![ContainerSample {
            container: "app".to_string(),
            cpu_millicores: cpu,
            memory_bytes: 256.0 * 1_048_576.0,
            request_cpu_millicores: 100.0,
            request_memory_bytes: 256.0 * 1_048_576.0,
        }],
    }
}

/// S1 — flat usage at the current request produces no recommendation.
#[tokio::test]
async fn s1_flat_data_produces_no_recommendation() {
    let (d, events) = deps();
    let w = workload();
    for i in 0..100_i64 {
        d.sample_store.add(w.clone(), flat_sample(i, 100.0));
    }
    let config = base_config();
    let status = Status::new_pending();
    let ctx = WorkloadContext {
        workload: w,
        total_replicas: 3,
        available_replicas: 3,
        current_unavailable: 0,
        disruption_limit: None,
        autoscalers: vec![],
    };
    let now = Utc.timestamp_opt(99, 0).unwrap();

    let (next_status, _, outcomes) = reconcile_config(&config, &status, &[ctx], &d, now).await;
    assert!(matches!(outcomes[0].1, ReconcileOutcome::NoRecommendation));
    assert_eq!(next_status.total_applied, 0);
    assert!(events.events().iter().all(|e| e.reason != rightsizer::events::EventReason::OptimizationApplied));
}

/// S3 — a cluster of severe CPU spikes blocks the recommendation via the
/// anomaly gate rather than the recommendation ever reaching the mutator.
#[tokio::test]
async fn s3_critical_anomaly_cluster_blocks_scaling() {
    let (d, events) = deps();
    let w = workload();
    for i in 0..100_i64 {
        d.sample_store.add(w.clone(), flat_sample(i, 100.0));
    }
    for i in [50, 51, 52] {
        d.sample_store.add(w.clone(), flat_sample(i, 800.0));
    }
    let config = base_config();
    let status = Status::new_pending();
    let ctx = WorkloadContext {
        workload: w,
        total_replicas: 3,
        available_replicas: 3,
        current_unavailable: 0,
        disruption_limit: None,
        autoscalers: vec![],
    };
    let now = Utc.timestamp_opt(99, 0).unwrap();

    let (_, _, outcomes) = reconcile_config(&config, &status, &[ctx], &d, now).await;
    assert!(
        matches!(outcomes[0].1, ReconcileOutcome::Blocked { reason: BlockReason::Anomaly, .. }),
        "expected anomaly block, got {:?}",
        outcomes[0].1
    );
    assert!(events.events().iter().any(|e| e.reason == rightsizer::events::EventReason::AnomalyDetected));
}

/// S4 — a disruption budget with no slack left blocks the apply.
#[tokio::test]
async fn s4_tight_disruption_budget_blocks_apply() {
    let (d, _events) = deps();
    let w = workload();
    let samples: Vec<f64> = (0..200_i64).map(|i| 100.0 + (i % 300) as f64).collect();
    for (i, cpu) in samples.into_iter().enumerate() {
        let mut s = flat_sample(i as i64, cpu);
        s.containers[0].request_cpu_millicores = 1000.0;
        d.sample_store.add(w.clone(), s);
    }
    let config = base_config();
    let status = Status::new_pending();
    let ctx = WorkloadContext {
        workload: w,
        total_replicas: 5,
        available_replicas: 5,
        current_unavailable: 0,
        disruption_limit: Some(BudgetLimit::MinAvailable(ResourceAmount::Absolute(5))),
        autoscalers: vec![],
    };
    let now = Utc.timestamp_opt(199, 0).unwrap();

    let (_, _, outcomes) = reconcile_config(&config, &status, &[ctx], &d, now).await;
    assert!(
        matches!(outcomes[0].1, ReconcileOutcome::Blocked { reason: BlockReason::DisruptionBudget, .. }),
        "expected disruption-budget block, got {:?}",
        outcomes[0].1
    );
}

/// S7 — with GitOps export enabled, an accepted recommendation is
/// rendered and written to disk instead of reaching the live mutator.
#[tokio::test]
async fn s7_gitops_export_writes_kustomize_bundle() {
    let (d, events) = deps();
    let w = workload();
    let samples: Vec<f64> = (0..200_i64).map(|i| 100.0 + (i % 300) as f64).collect();
    for (i, cpu) in samples.into_iter().enumerate() {
        let mut s = flat_sample(i as i64, cpu);
        s.containers[0].request_cpu_millicores = 1000.0;
        d.sample_store.add(w.clone(), s);
    }
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    config.gitops = GitOpsExportConfig {
        enabled: true,
        output_path: dir.path().to_string_lossy().into_owned(),
        ..GitOpsExportConfig::default()
    };
    let status = Status::new_pending();
    let ctx = WorkloadContext {
        workload: w,
        total_replicas: 5,
        available_replicas: 5,
        current_unavailable: 0,
        disruption_limit: None,
        autoscalers: vec![],
    };
    let now = Utc.timestamp_opt(199, 0).unwrap();

    let (next_status, _, outcomes) = reconcile_config(&config, &status, &[ctx], &d, now).await;
    match &outcomes[0].1 {
        ReconcileOutcome::Exported { paths, .. } => {
            assert!(paths.iter().any(|p| p.ends_with("kustomization.yaml")));
            let kustomization = std::fs::read_to_string(dir.path().join("kustomization.yaml")).unwrap();
            assert!(kustomization.contains(".yaml"));
        }
        other => panic!("expected Exported outcome, got {other:?}"),
    }
    assert_eq!(next_status.total_applied, 1);
    assert!(events.events().iter().any(|e| e.reason == rightsizer::events::EventReason::GitOpsExportSucceeded));
}
