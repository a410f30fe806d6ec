//! `rightsizer-controller` — the binary that wires the library's
//! reconciliation core to a running process: CLI flags, tracing, the
//! health/readiness surface, leader election, and the work-queue worker
//! pool. The cluster API client, kubeconfig loading, and the `Config`
//! informer are out of scope for the core (§1, §6 of the design spec) —
//! this binary defines the seams for them and runs a single in-process
//! lease store so the controller is runnable standalone; swap
//! [`rightsizer::leader::LeaseStore`] for a real cluster lease backend to
//! deploy it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rightsizer::api::{self, ReadinessState};
use rightsizer::leader::{self, ElectionOutcome, Lease, LeaseConfig, LeaseStore};
use rightsizer::metrics::Metrics;
use rightsizer::queue::{RateLimiterConfig, WorkQueue};
use rightsizer::types::WorkloadKey;

/// Flags per the controller's documented CLI surface. `--kubeconfig`,
/// `--namespace`, and the cluster connection itself belong to the
/// external cluster-client collaborator; they are accepted here and
/// logged so operators can see they were received, but this binary does
/// not parse or dial them — that integration point is intentionally left
/// for the embedding deployment.
#[derive(Parser, Debug)]
#[command(name = "rightsizer-controller")]
#[command(about = "Cluster-level vertical-resource optimizer controller")]
#[command(version)]
struct CliArgs {
    /// Path to a kubeconfig file. Loading it is an external collaborator
    /// (§1); accepted here only to be threaded through to that loader.
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<String>,

    /// Namespace to watch for `Config` objects. Empty means all namespaces.
    #[arg(long, default_value = "")]
    namespace: String,

    /// Number of reconcile worker tasks draining the work queue.
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Address the health/readiness/metrics HTTP surface binds to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    health_addr: String,

    #[arg(long, default_value = "rightsizer-controller")]
    lease_lock_name: String,

    #[arg(long, default_value = "default")]
    lease_lock_namespace: String,

    #[arg(long, default_value_t = true)]
    leader_elect: bool,

    /// Lease duration in seconds.
    #[arg(long, default_value_t = 15)]
    lease_duration: u64,

    /// Renew deadline in seconds.
    #[arg(long, default_value_t = 10)]
    renew_deadline: u64,

    /// Retry period in seconds between election attempts.
    #[arg(long, default_value_t = 2)]
    retry_period: u64,
}

/// Single-process lease store standing in for a real cluster `Lease`
/// object. Sufficient for running the controller as a single replica;
/// a multi-replica deployment supplies its own [`LeaseStore`] backed by
/// the cluster API.
struct InMemoryLeaseStore {
    lease: Mutex<Option<Lease>>,
}

impl InMemoryLeaseStore {
    fn new() -> Self {
        Self { lease: Mutex::new(None) }
    }
}

impl LeaseStore for InMemoryLeaseStore {
    fn get(&self) -> Option<Lease> {
        self.lease.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn try_write(&self, lease: &Lease, expected_renew_time: Option<chrono::DateTime<Utc>>) -> bool {
        let mut guard = self.lease.lock().unwrap_or_else(|e| e.into_inner());
        let ok = match (&*guard, expected_renew_time) {
            (None, None) => true,
            (Some(current), Some(expected)) => current.renew_time == expected,
            _ => false,
        };
        if ok {
            *guard = Some(lease.clone());
        }
        ok
    }
}

/// Run the leader-election loop until either shutdown is requested
/// (returns `Ok(())`) or this replica loses leadership after having held
/// it (returns an error so the process exits non-zero and a supervisor
/// restarts it, per §6's exit-code contract).
async fn run_leader_election(
    store: Arc<dyn LeaseStore>,
    identity: String,
    config: LeaseConfig,
    readiness: ReadinessState,
    cancel: CancellationToken,
) -> Result<()> {
    let mut is_leader = false;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let now = Utc::now();
        let outcome = leader::try_acquire_or_renew(store.as_ref(), &identity, &config, now);
        match outcome {
            ElectionOutcome::AcquiredOrRenewed => {
                if !is_leader {
                    info!(identity = %identity, "acquired leadership");
                    is_leader = true;
                    readiness.set_leader(true);
                }
            }
            ElectionOutcome::LostOrDenied => {
                if is_leader {
                    error!(identity = %identity, "lost leadership, exiting for supervisor restart");
                    readiness.set_leader(false);
                    anyhow::bail!("leader election lost");
                }
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(config.retry_period) => {}
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}

/// A reconcile worker: drains the queue, and for each dequeued key would
/// invoke `controller::reconcile_config` against the `Config`/sample
/// store/mutator the embedding deployment supplies. With no `Config`
/// source wired into this standalone binary, the worker logs the key and
/// immediately marks the queue item done; an embedding application
/// replaces this loop body with a real reconcile call.
async fn run_worker(id: usize, queue: Arc<WorkQueue<WorkloadKey>>, metrics: Arc<Metrics>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            key = queue.get() => {
                info!(worker = id, workload = %key.queue_key(), "dequeued key (no Config source wired; skipping)");
                metrics.record_reconcile();
                queue.forget(&key).await;
                queue.done(&key).await;
            }
            _ = cancel.cancelled() => {
                info!(worker = id, "worker shutting down");
                return;
            }
        }
    }
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .json()
        .init();

    let args = CliArgs::parse();

    info!(
        kubeconfig = ?args.kubeconfig,
        namespace = %args.namespace,
        workers = args.workers,
        leader_elect = args.leader_elect,
        "starting rightsizer-controller"
    );

    let metrics = Arc::new(Metrics::new());
    let readiness = ReadinessState::new(Arc::clone(&metrics));
    let cancel = CancellationToken::new();

    let health_app = api::router(readiness.clone());
    let health_addr = args.health_addr.clone();
    let listener = tokio::net::TcpListener::bind(&health_addr)
        .await
        .with_context(|| format!("failed to bind health surface on {health_addr}"))?;
    let health_cancel = cancel.clone();
    let health_task = tokio::spawn(async move {
        axum::serve(listener, health_app)
            .with_graceful_shutdown(async move { health_cancel.cancelled().await })
            .await
    });

    let queue = WorkQueue::<WorkloadKey>::new(RateLimiterConfig::default());
    let mut worker_tasks = Vec::with_capacity(args.workers);
    for id in 0..args.workers.max(1) {
        let queue = Arc::clone(&queue);
        let metrics = Arc::clone(&metrics);
        let cancel = cancel.clone();
        worker_tasks.push(tokio::spawn(run_worker(id, queue, metrics, cancel)));
    }

    let election_result = if args.leader_elect {
        let lease_config = LeaseConfig {
            lease_duration: Duration::from_secs(args.lease_duration),
            renew_deadline: Duration::from_secs(args.renew_deadline),
            retry_period: Duration::from_secs(args.retry_period),
        };
        info!(
            lock_name = %args.lease_lock_name,
            lock_namespace = %args.lease_lock_namespace,
            "leader election enabled"
        );
        let store: Arc<dyn LeaseStore> = Arc::new(InMemoryLeaseStore::new());
        let identity = leader::identity();
        let readiness = readiness.clone();
        let cancel_for_election = cancel.clone();
        tokio::select! {
            result = run_leader_election(store, identity, lease_config, readiness, cancel_for_election) => result,
            () = shutdown_signal() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    } else {
        readiness.set_leader(true);
        shutdown_signal().await;
        info!("shutdown signal received");
        Ok(())
    };

    cancel.cancel();
    for task in worker_tasks {
        let _ = task.await;
    }
    let _ = health_task.await;

    match election_result {
        Ok(()) => {
            info!("rightsizer-controller shutdown complete");
            Ok(())
        }
        Err(error) => {
            warn!(%error, "rightsizer-controller exiting non-zero");
            Err(error)
        }
    }
}
