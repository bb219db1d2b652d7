use std::time::Duration;

/// Per-key retry backoff: `first * factor^failures`, capped at `max`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Ceiling for the computed delay.
    pub max: Duration,
    /// Growth factor applied per failure.
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_millis(5),
            max: Duration::from_secs(1000),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the retry following the given number of failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let scaled = self.first.as_secs_f64() * self.factor.powf(failures.into());
        if scaled.is_finite() && scaled < self.max.as_secs_f64() {
            Duration::from_secs_f64(scaled)
        } else {
            self.max
        }
    }
}

/// Global dequeue throughput cap: a token bucket refilled at `qps` with
/// `burst` capacity.
#[derive(Debug, Clone)]
pub struct BucketPolicy {
    pub qps: f64,
    pub burst: u32,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            qps: 10.0,
            burst: 100,
        }
    }
}

/// Rate limiting configuration for a [`WorkQueue`](crate::WorkQueue).
///
/// The effective retry delay for a key is the larger of the per-key backoff
/// and the bucket reservation, when a bucket is configured.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub backoff: BackoffPolicy,
    pub bucket: Option<BucketPolicy>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            bucket: Some(BucketPolicy::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::BackoffPolicy;

    #[test]
    fn delay_grows_exponentially() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
        };

        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
        };

        assert_eq!(policy.delay(10), Duration::from_secs(60));
        // large exponents overflow into infinity; still capped
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(60));
    }
}
