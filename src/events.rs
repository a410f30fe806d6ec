//! Event recorder: the named interface external callers implement to
//! surface reconcile-time decisions as Kubernetes-style events (§6).
//! The core never emits events directly to a cluster; it only calls this
//! trait, so tests can assert against an in-memory recorder.

/// Enumerated event reasons emitted by the reconciler and safety
/// pipeline. Kept as a closed set so callers can pattern-match instead of
/// string-comparing free-form reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    OptimizationApplied,
    DryRunSimulated,
    CircuitBreakerOpen,
    CircuitBreakerClosed,
    AnomalyDetected,
    PdbViolation,
    HpaConflictDetected,
    MaintenanceWindowSkipped,
    SlaViolation,
    RollbackRecommended,
    GitOpsExportSucceeded,
    GitOpsExportFailed,
    ReconcileFailed,
    ConfigInvalid,
}

impl EventReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EventReason::OptimizationApplied => "OptimizationApplied",
            EventReason::DryRunSimulated => "DryRunSimulated",
            EventReason::CircuitBreakerOpen => "CircuitBreakerOpen",
            EventReason::CircuitBreakerClosed => "CircuitBreakerClosed",
            EventReason::AnomalyDetected => "AnomalyDetected",
            EventReason::PdbViolation => "PDBViolation",
            EventReason::HpaConflictDetected => "HPAConflictDetected",
            EventReason::MaintenanceWindowSkipped => "MaintenanceWindowSkipped",
            EventReason::SlaViolation => "SLAViolation",
            EventReason::RollbackRecommended => "RollbackRecommended",
            EventReason::GitOpsExportSucceeded => "GitOpsExportSucceeded",
            EventReason::GitOpsExportFailed => "GitOpsExportFailed",
            EventReason::ReconcileFailed => "ReconcileFailed",
            EventReason::ConfigInvalid => "ConfigInvalid",
        }
    }

    /// Whether this reason denotes a warning-level event rather than a
    /// normal/informational one, per §6 and §7 (safety blocks and
    /// failures are warnings; successful applies and exports are normal).
    pub fn is_warning(self) -> bool {
        !matches!(
            self,
            EventReason::OptimizationApplied | EventReason::DryRunSimulated | EventReason::CircuitBreakerClosed | EventReason::GitOpsExportSucceeded
        )
    }
}

/// Identifies the object an event is attached to. Named-interface only;
/// the concrete cluster object type lives with the external caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

/// External collaborator: emits events against a cluster object. The
/// reconciler calls `record_normal`/`record_warning`; it never touches an
/// event sink directly.
pub trait EventRecorder: Send + Sync {
    fn record_normal(&self, object: &ObjectRef, reason: EventReason, message: &str);
    fn record_warning(&self, object: &ObjectRef, reason: EventReason, message: &str);
}

/// In-memory recorder used by tests and by the demo binary when no real
/// event sink is wired up.
#[derive(Debug)]
pub struct RecordedEvent {
    pub object: ObjectRef,
    pub reason: EventReason,
    pub message: String,
    pub warning: bool,
}

#[derive(Default)]
pub struct InMemoryEventRecorder {
    events: std::sync::Mutex<Vec<RecordedEvent>>,
}

impl InMemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|e| RecordedEvent {
                object: e.object.clone(),
                reason: e.reason,
                message: e.message.clone(),
                warning: e.warning,
            })
            .collect()
    }
}

impl EventRecorder for InMemoryEventRecorder {
    fn record_normal(&self, object: &ObjectRef, reason: EventReason, message: &str) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(RecordedEvent {
            object: object.clone(),
            reason,
            message: message.to_string(),
            warning: false,
        });
    }

    fn record_warning(&self, object: &ObjectRef, reason: EventReason, message: &str) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(RecordedEvent {
            object: object.clone(),
            reason,
            message: message.to_string(),
            warning: true,
        });
    }
}
