use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::trace;

use crate::limiter::RateLimiter;
use crate::policy::QueueConfig;

/// Bound on the key types a [`WorkQueue`] can carry.
pub trait Key: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Key for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Deduplicating, rate-limited work queue.
///
/// Guarantees, per key:
/// - however many times a pending key is added, it is delivered once;
/// - a key is never handed to two consumers at the same time;
/// - a key added while a consumer holds it is delivered exactly once more,
///   after that consumer calls [`done`](WorkQueue::done).
///
/// Keys are delivered in the order they became pending. The handle is cheaply
/// cloneable; all clones share one queue and may be used concurrently from
/// any number of producers and consumers.
pub struct WorkQueue<K> {
    shared: Arc<Shared<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<K> {
    inner: Mutex<Inner<K>>,
    wakeup: Notify,
}

struct Inner<K> {
    /// Keys waiting for delivery, in arrival order.
    pending: VecDeque<K>,
    /// Membership index over `pending`.
    pending_set: HashSet<K>,
    /// Keys currently checked out by a consumer.
    processing: HashSet<K>,
    /// Keys re-added while they were processing.
    dirty: HashSet<K>,
    shutting_down: bool,
    limiter: RateLimiter<K>,
}

impl<K: Key> WorkQueue<K> {
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    pending: VecDeque::new(),
                    pending_set: HashSet::new(),
                    processing: HashSet::new(),
                    dirty: HashSet::new(),
                    shutting_down: false,
                    limiter: RateLimiter::new(cfg),
                }),
                wakeup: Notify::new(),
            }),
        }
    }

    /// Enqueue `key` for delivery. Idempotent while the key is pending;
    /// a key currently processing is marked dirty instead so it gets exactly
    /// one more delivery. Never blocks. Ignored once the queue is shutting
    /// down.
    pub async fn add(&self, key: K) {
        let mut q = self.shared.inner.lock().await;
        if q.shutting_down {
            return;
        }
        if q.processing.contains(&key) {
            q.dirty.insert(key);
            return;
        }
        if q.pending_set.insert(key.clone()) {
            q.pending.push_back(key);
            self.shared.wakeup.notify_one();
        }
    }

    /// Enqueue `key` after `delay` has elapsed.
    pub fn add_after(&self, key: K, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            queue.add(key).await;
        });
    }

    /// Enqueue `key` after the delay its failure history calls for.
    ///
    /// Each call bumps the key's failure counter; [`forget`](WorkQueue::forget)
    /// resets it.
    pub async fn add_rate_limited(&self, key: K) {
        let delay = {
            let mut q = self.shared.inner.lock().await;
            q.limiter.next_delay(&key)
        };
        trace!(delay_ms = delay.as_millis() as u64, "requeue with backoff");
        self.add_after(key, delay);
    }

    /// Next key to work on, in pending order. The key stays checked out until
    /// [`done`](WorkQueue::done). Resolves to `None` once the queue has shut
    /// down and drained its pending items.
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.shared.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut q = self.shared.inner.lock().await;
                if let Some(key) = q.pending.pop_front() {
                    q.pending_set.remove(&key);
                    q.processing.insert(key.clone());
                    if !q.pending.is_empty() {
                        // pass the wakeup along in case this consumer absorbed
                        // a signal meant for another
                        self.shared.wakeup.notify_one();
                    }
                    return Some(key);
                }
                if q.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Return a checked-out key. If the key went dirty while it was out, it
    /// moves back to the end of the pending queue; this still happens during
    /// shutdown so the drain does not lose the update.
    pub async fn done(&self, key: K) {
        let mut q = self.shared.inner.lock().await;
        q.processing.remove(&key);
        if q.dirty.remove(&key) && q.pending_set.insert(key.clone()) {
            q.pending.push_back(key);
            self.shared.wakeup.notify_one();
        }
    }

    /// Reset the failure counter for `key`. Call after a successful sync and
    /// on final drop.
    pub async fn forget(&self, key: &K) {
        let mut q = self.shared.inner.lock().await;
        q.limiter.forget(key);
    }

    /// Number of times `key` has been requeued after a failure.
    pub async fn num_requeues(&self, key: &K) -> u32 {
        let q = self.shared.inner.lock().await;
        q.limiter.retries(key)
    }

    /// Stop accepting new keys. Consumers keep draining what is already
    /// pending; afterwards every [`get`](WorkQueue::get) resolves to `None`.
    pub async fn shut_down(&self) {
        {
            let mut q = self.shared.inner.lock().await;
            q.shutting_down = true;
        }
        self.shared.wakeup.notify_waiters();
    }

    /// Number of keys waiting for delivery.
    pub async fn len(&self) -> usize {
        let q = self.shared.inner.lock().await;
        q.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::WorkQueue;
    use crate::policy::{BackoffPolicy, QueueConfig};

    fn queue() -> WorkQueue<String> {
        // no bucket: tests drive pacing explicitly
        WorkQueue::new(QueueConfig {
            backoff: BackoffPolicy {
                first: Duration::from_millis(10),
                max: Duration::from_millis(80),
                factor: 2.0,
            },
            bucket: None,
        })
    }

    async fn assert_blocks(q: &WorkQueue<String>) {
        let blocked = tokio::time::timeout(Duration::from_secs(1), q.get()).await;
        assert!(blocked.is_err(), "get() should have found nothing");
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_adds_deliver_once() {
        let q = queue();

        q.add("a".to_string()).await;
        q.add("a".to_string()).await;
        q.add("a".to_string()).await;

        assert_eq!(q.get().await, Some("a".to_string()));
        assert_eq!(q.len().await, 0);
        assert_blocks(&q).await;
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_preserves_pending_order() {
        let q = queue();

        for key in ["a", "b", "c"] {
            q.add(key.to_string()).await;
        }

        assert_eq!(q.get().await, Some("a".to_string()));
        assert_eq!(q.get().await, Some("b".to_string()));
        assert_eq!(q.get().await, Some("c".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn add_while_processing_redelivers_exactly_once() {
        let q = queue();

        q.add("a".to_string()).await;
        let key = q.get().await.unwrap();

        // the consumer still holds the key: these must not deliver
        q.add("a".to_string()).await;
        q.add("a".to_string()).await;
        assert_blocks(&q).await;

        q.done(key).await;
        assert_eq!(q.get().await, Some("a".to_string()));

        q.done("a".to_string()).await;
        assert_blocks(&q).await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_concurrent_delivery_of_one_key() {
        let q = queue();

        q.add("a".to_string()).await;
        assert_eq!(q.get().await, Some("a".to_string()));
        q.add("a".to_string()).await;

        // second consumer: nothing to take while "a" is out
        assert_blocks(&q).await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_pending_then_stops() {
        let q = queue();

        q.add("a".to_string()).await;
        q.add("b".to_string()).await;
        q.shut_down().await;

        assert_eq!(q.get().await, Some("a".to_string()));
        assert_eq!(q.get().await, Some("b".to_string()));
        assert_eq!(q.get().await, None);
        assert_eq!(q.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wakes_blocked_consumers() {
        let q = queue();
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.get().await })
        };

        tokio::task::yield_now().await;
        q.shut_down().await;

        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn add_after_shutdown_is_ignored() {
        let q = queue();

        q.shut_down().await;
        q.add("a".to_string()).await;

        assert_eq!(q.len().await, 0);
        assert_eq!(q.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dirty_key_survives_shutdown_drain() {
        let q = queue();

        q.add("a".to_string()).await;
        let key = q.get().await.unwrap();
        q.add("a".to_string()).await;
        q.shut_down().await;

        q.done(key).await;
        assert_eq!(q.get().await, Some("a".to_string()));
        q.done("a".to_string()).await;
        assert_eq!(q.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn add_after_delivers_once_the_delay_passes() {
        let q = queue();

        q.add_after("a".to_string(), Duration::from_secs(5));
        // paused clock auto-advances once the runtime is otherwise idle
        assert_eq!(q.get().await, Some("a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_adds_count_requeues_and_forget_resets() {
        let q = queue();

        q.add_rate_limited("a".to_string()).await;
        assert_eq!(q.get().await, Some("a".to_string()));
        q.done("a".to_string()).await;
        q.add_rate_limited("a".to_string()).await;
        assert_eq!(q.num_requeues(&"a".to_string()).await, 2);

        assert_eq!(q.get().await, Some("a".to_string()));
        q.done("a".to_string()).await;

        q.forget(&"a".to_string()).await;
        assert_eq!(q.num_requeues(&"a".to_string()).await, 0);
    }
}
