//! Health/readiness HTTP surface (§10.2 of the expanded spec). `/healthz`
//! always reports 200 once the process is up; `/readyz` reports 503 until
//! this replica has won leader election and completed its first
//! reconcile, matching the "don't route traffic to a cold controller"
//! convention the teacher's dashboard API follows for its own `/health`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use axum::http::StatusCode;
use serde_json::json;

use crate::metrics::Metrics;

/// Shared readiness flags, flipped by the controller binary as leader
/// election and the first reconcile complete.
#[derive(Clone)]
pub struct ReadinessState {
    is_leader: Arc<AtomicBool>,
    first_reconcile_done: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl ReadinessState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            is_leader: Arc::new(AtomicBool::new(false)),
            first_reconcile_done: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }

    pub fn set_leader(&self, is_leader: bool) {
        self.is_leader.store(is_leader, Ordering::SeqCst);
    }

    pub fn mark_first_reconcile_done(&self) {
        self.first_reconcile_done.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst) && self.first_reconcile_done.load(Ordering::SeqCst)
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(state: axum::extract::State<ReadinessState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({"ready": true})))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"ready": false})))
    }
}

async fn metricsz(state: axum::extract::State<ReadinessState>) -> Json<serde_json::Value> {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "reconciles_total": snapshot.reconciles_total,
        "reconcile_errors_total": snapshot.reconcile_errors_total,
        "applied_total": snapshot.applied_total,
        "circuit_opens_total": snapshot.circuit_opens_total,
        "circuit_closes_total": snapshot.circuit_closes_total,
        "safety_blocks_by_reason": snapshot.safety_blocks_by_reason,
    }))
}

pub fn router(state: ReadinessState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metricsz))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> ReadinessState {
        ReadinessState::new(Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn healthz_always_reports_ok() {
        let app = router(state());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_is_unavailable_until_leader_and_first_reconcile() {
        let s = state();
        let app = router(s.clone());
        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        s.set_leader(true);
        s.mark_first_reconcile_done();
        assert!(s.is_ready());
    }
}
