//! Deduplicating, rate-limited work queue.
//!
//! Producers hand opaque keys to the queue; consumers pull them out one at a
//! time. The queue guarantees at-most-one-in-flight per key and turns retry
//! scheduling into per-key exponential backoff with an optional global
//! throughput cap.
mod limiter;

mod policy;
pub use policy::{BackoffPolicy, BucketPolicy, QueueConfig};

mod queue;
pub use queue::{Key, WorkQueue};
