use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

use crate::policy::{BucketPolicy, QueueConfig};

/// Retry accounting and pacing for queue items.
///
/// Combines per-key exponential backoff with an optional global token
/// bucket; the effective delay is the larger of the two. Not synchronized:
/// lives behind the queue's own lock.
pub(crate) struct RateLimiter<K> {
    failures: HashMap<K, u32>,
    bucket: Option<TokenBucket>,
    cfg: QueueConfig,
}

impl<K> RateLimiter<K>
where
    K: Clone + Eq + Hash,
{
    pub(crate) fn new(cfg: QueueConfig) -> Self {
        Self {
            failures: HashMap::new(),
            bucket: cfg.bucket.as_ref().map(TokenBucket::new),
            cfg,
        }
    }

    /// Delay before `key` may be retried; bumps its failure counter.
    pub(crate) fn next_delay(&mut self, key: &K) -> Duration {
        let failures = self.failures.entry(key.clone()).or_insert(0);
        let backoff = self.cfg.backoff.delay(*failures);
        *failures += 1;

        let paced = match self.bucket.as_mut() {
            Some(bucket) => bucket.reserve(Instant::now()),
            None => Duration::ZERO,
        };
        backoff.max(paced)
    }

    /// Current failure counter for `key`.
    pub(crate) fn retries(&self, key: &K) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    /// Drop the failure counter for `key`.
    pub(crate) fn forget(&mut self, key: &K) {
        self.failures.remove(key);
    }
}

/// Token bucket over virtual time. The token balance may go negative, in
/// which case the caller owes the deficit as a wait before its reservation
/// becomes usable.
struct TokenBucket {
    qps: f64,
    burst: f64,
    tokens: f64,
    refilled: Instant,
}

impl TokenBucket {
    fn new(policy: &BucketPolicy) -> Self {
        Self {
            qps: policy.qps,
            burst: f64::from(policy.burst),
            tokens: f64::from(policy.burst),
            refilled: Instant::now(),
        }
    }

    fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.refilled).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.qps).min(self.burst);
        self.refilled = now;

        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.qps)
        }
    }
}
