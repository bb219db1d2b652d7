use tracing::error;

use crate::error::CoreError;

/// Receives errors the engine will not retry again.
///
/// Invoked exactly once per key dropped after its retry budget, and once per
/// notification payload no key could be derived from. Never invoked for
/// failures that are still being retried.
pub trait Reporter: Send + Sync {
    fn report(&self, key: &str, err: &CoreError);
}

/// Reporter that emits a tracing error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, key: &str, err: &CoreError) {
        error!(key = %key, error = %err, "giving up on setting");
    }
}
