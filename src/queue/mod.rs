//! Work queue / informer: a single-flight-per-key, rate-limited-retry
//! queue feeding the reconcile workers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::warn;

/// Exponential back-off parameters for `add_rate_limited`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            max_retries: 5,
        }
    }
}

fn backoff_delay(attempt: u32, config: RateLimiterConfig) -> Duration {
    let exp = 2u64.saturating_pow(attempt.min(20));
    let scaled = config.base_delay.saturating_mul(exp as u32);
    scaled.min(config.max_delay)
}

struct Inner<K> {
    queue: VecDeque<K>,
    queued: HashSet<K>,
    processing: HashSet<K>,
    retries: HashMap<K, u32>,
}

/// Event kinds the informer's handlers translate into enqueues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformerEvent {
    Add,
    Update,
    Delete,
}

/// A single-flight-per-key work queue. `Get` never returns a key that is
/// already being processed by another worker; re-adding a key already
/// queued (but not yet picked up) coalesces into the existing entry.
pub struct WorkQueue<K: Eq + Hash + Clone + Send + Sync + 'static> {
    inner: Mutex<Inner<K>>,
    notify: Notify,
    rate_limiter: RateLimiterConfig,
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static + std::fmt::Debug> WorkQueue<K> {
    pub fn new(rate_limiter: RateLimiterConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                queued: HashSet::new(),
                processing: HashSet::new(),
                retries: HashMap::new(),
            }),
            notify: Notify::new(),
            rate_limiter,
        })
    }

    /// Enqueue `key`, computed from an informer event. Coalesces if
    /// already queued.
    pub async fn add(&self, key: K, _event: InformerEvent) {
        let mut inner = self.inner.lock().await;
        if inner.queued.insert(key.clone()) {
            inner.queue.push_back(key);
            drop(inner);
            self.notify.notify_one();
        }
    }

    /// Block until a key is available that is not already being
    /// processed, then mark it in-flight and return it.
    pub async fn get(&self) -> K {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(pos) = inner.queue.iter().position(|k| !inner.processing.contains(k)) {
                    let key = inner.queue.remove(pos).expect("position was just found");
                    inner.queued.remove(&key);
                    inner.processing.insert(key.clone());
                    return key;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Mark `key` as no longer being processed, permitting re-entry.
    pub async fn done(&self, key: &K) {
        let mut inner = self.inner.lock().await;
        inner.processing.remove(key);
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Reset the retry counter for `key` (call after a successful
    /// process).
    pub async fn forget(&self, key: &K) {
        let mut inner = self.inner.lock().await;
        inner.retries.remove(key);
    }

    /// Re-queue `key` with exponential back-off. Drops the key with a
    /// logged error once `max_retries` is exceeded.
    pub fn add_rate_limited(self: &Arc<Self>, key: K) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let attempt = {
                let mut inner = queue.inner.lock().await;
                let attempt = inner.retries.entry(key.clone()).or_insert(0);
                *attempt += 1;
                *attempt
            };
            if attempt > queue.rate_limiter.max_retries {
                warn!(?key, attempt, "dropping key after exceeding max retries");
                let mut inner = queue.inner.lock().await;
                inner.retries.remove(&key);
                return;
            }
            let delay = backoff_delay(attempt - 1, queue.rate_limiter);
            tokio::time::sleep(delay).await;
            queue.add(key, InformerEvent::Update).await;
        });
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coalesces_duplicate_adds() {
        let queue = WorkQueue::<String>::new(RateLimiterConfig::default());
        queue.add("a".to_string(), InformerEvent::Add).await;
        queue.add("a".to_string(), InformerEvent::Update).await;
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn get_marks_key_in_flight_and_done_releases_it() {
        let queue = WorkQueue::<String>::new(RateLimiterConfig::default());
        queue.add("a".to_string(), InformerEvent::Add).await;
        let key = queue.get().await;
        assert_eq!(key, "a");
        assert!(queue.is_empty().await);
        queue.done(&key).await;

        queue.add("a".to_string(), InformerEvent::Add).await;
        let again = queue.get().await;
        assert_eq!(again, "a");
    }

    #[tokio::test]
    async fn single_flight_blocks_concurrent_get_of_same_key() {
        let queue = WorkQueue::<String>::new(RateLimiterConfig::default());
        queue.add("a".to_string(), InformerEvent::Add).await;
        let first = queue.get().await;
        queue.add("a".to_string(), InformerEvent::Update).await;

        let queue2 = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            tokio::time::timeout(Duration::from_millis(50), queue2.get()).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.done(&first).await;
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "expected get() to resolve once the in-flight key was done()");
    }

    #[test]
    fn backoff_delay_grows_and_caps() {
        let config = RateLimiterConfig::default();
        let first = backoff_delay(0, config);
        let later = backoff_delay(10, config);
        assert!(first < later);
        assert!(later <= config.max_delay);
    }
}
