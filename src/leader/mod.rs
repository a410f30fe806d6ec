//! Leader election: a lease-lock protocol so only one replica runs the
//! controller loop. On leader loss the process is expected to exit so the
//! supervisor restarts it.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct LeaseConfig {
    pub lease_duration: std::time::Duration,
    pub renew_deadline: std::time::Duration,
    pub retry_period: std::time::Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            lease_duration: std::time::Duration::from_secs(15),
            renew_deadline: std::time::Duration::from_secs(10),
            retry_period: std::time::Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lease {
    pub holder_identity: String,
    pub acquire_time: DateTime<Utc>,
    pub renew_time: DateTime<Utc>,
}

impl Lease {
    pub fn is_expired(&self, config: &LeaseConfig, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.renew_time);
        elapsed >= chrono::Duration::from_std(config.lease_duration).unwrap_or(chrono::Duration::zero())
    }
}

/// Abstraction over the cluster's lease object, so leader election can be
/// unit-tested without a live API server.
pub trait LeaseStore: Send + Sync {
    /// Read the current lease, if one is held.
    fn get(&self) -> Option<Lease>;
    /// Attempt to write `lease` as the new lease, succeeding only if no
    /// other holder has written since `expected_renew_time` (optimistic
    /// concurrency). Returns `true` on success.
    fn try_write(&self, lease: &Lease, expected_renew_time: Option<DateTime<Utc>>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    AcquiredOrRenewed,
    LostOrDenied,
}

/// Run one election attempt: acquire the lease if unheld or expired,
/// renew it if we already hold it, or fail if another healthy holder
/// exists.
pub fn try_acquire_or_renew(store: &dyn LeaseStore, identity: &str, config: &LeaseConfig, now: DateTime<Utc>) -> ElectionOutcome {
    match store.get() {
        None => {
            let lease = Lease { holder_identity: identity.to_string(), acquire_time: now, renew_time: now };
            if store.try_write(&lease, None) {
                ElectionOutcome::AcquiredOrRenewed
            } else {
                ElectionOutcome::LostOrDenied
            }
        }
        Some(existing) => {
            if existing.holder_identity == identity {
                let renewed = Lease { renew_time: now, ..existing.clone() };
                if store.try_write(&renewed, Some(existing.renew_time)) {
                    ElectionOutcome::AcquiredOrRenewed
                } else {
                    ElectionOutcome::LostOrDenied
                }
            } else if existing.is_expired(config, now) {
                let lease = Lease { holder_identity: identity.to_string(), acquire_time: now, renew_time: now };
                if store.try_write(&lease, Some(existing.renew_time)) {
                    ElectionOutcome::AcquiredOrRenewed
                } else {
                    ElectionOutcome::LostOrDenied
                }
            } else {
                ElectionOutcome::LostOrDenied
            }
        }
    }
}

/// The process identity used as `holder_identity`: the local hostname,
/// falling back to a fixed placeholder if it cannot be determined.
pub fn identity() -> String {
    hostname_or_fallback()
}

fn hostname_or_fallback() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "rightsizer-controller".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct FakeStore {
        lease: Mutex<Option<Lease>>,
    }

    impl LeaseStore for FakeStore {
        fn get(&self) -> Option<Lease> {
            self.lease.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
        fn try_write(&self, lease: &Lease, expected_renew_time: Option<DateTime<Utc>>) -> bool {
            let mut guard = self.lease.lock().unwrap_or_else(|e| e.into_inner());
            let ok = match (&*guard, expected_renew_time) {
                (None, None) => true,
                (Some(c), Some(expected)) => c.renew_time == expected,
                _ => false,
            };
            if ok {
                *guard = Some(lease.clone());
            }
            ok
        }
    }

    #[test]
    fn acquires_unheld_lease() {
        let store = FakeStore { lease: Mutex::new(None) };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let outcome = try_acquire_or_renew(&store, "host-a", &LeaseConfig::default(), now);
        assert_eq!(outcome, ElectionOutcome::AcquiredOrRenewed);
    }

    #[test]
    fn refuses_to_steal_fresh_lease() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let store = FakeStore {
            lease: Mutex::new(Some(Lease { holder_identity: "host-b".to_string(), acquire_time: now, renew_time: now })),
        };
        let outcome = try_acquire_or_renew(&store, "host-a", &LeaseConfig::default(), now + chrono::Duration::seconds(2));
        assert_eq!(outcome, ElectionOutcome::LostOrDenied);
    }

    #[test]
    fn takes_over_expired_lease() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let store = FakeStore {
            lease: Mutex::new(Some(Lease { holder_identity: "host-b".to_string(), acquire_time: now, renew_time: now })),
        };
        let later = now + chrono::Duration::seconds(30);
        let outcome = try_acquire_or_renew(&store, "host-a", &LeaseConfig::default(), later);
        assert_eq!(outcome, ElectionOutcome::AcquiredOrRenewed);
    }

    #[test]
    fn current_holder_renews_successfully() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let store = FakeStore {
            lease: Mutex::new(Some(Lease { holder_identity: "host-a".to_string(), acquire_time: now, renew_time: now })),
        };
        let outcome = try_acquire_or_renew(&store, "host-a", &LeaseConfig::default(), now + chrono::Duration::seconds(2));
        assert_eq!(outcome, ElectionOutcome::AcquiredOrRenewed);
    }
}
