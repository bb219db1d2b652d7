//! The setting controller: worker loop plus the debounced, idempotent sync
//! handler for the upgrade checker setting.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tend_model::SettingName;
use tend_queue::{QueueConfig, WorkQueue};

use crate::checker::UpgradeChecker;
use crate::error::{CoreError, SyncError};
use crate::report::Reporter;
use crate::store::SettingStore;

/// Spacing between successful remote upgrade checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Retry budget per key. A safety valve against poison keys, not a
/// correctness mechanism.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Tuning knobs for [`SettingController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Minimum wall-clock spacing between successful remote checks.
    pub check_interval: Duration,
    /// Failures per key before the engine drops it and reports.
    pub max_retries: u32,
    /// Worker pool size. Per-key exclusivity holds for any size; one worker
    /// is enough for the handful of settings this controller owns.
    pub workers: usize,
    pub queue: QueueConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            workers: 1,
            queue: QueueConfig::default(),
        }
    }
}

/// Reconciles settings and keeps the cached latest-version setting fresh.
///
/// Change notifications go in through [`enqueue`](SettingController::enqueue);
/// the queue serializes work per key, so the sync handler never runs twice
/// concurrently for the same setting.
pub struct SettingController {
    store: Arc<dyn SettingStore>,
    checker: Arc<dyn UpgradeChecker>,
    reporter: Arc<dyn Reporter>,
    queue: WorkQueue<String>,
    cfg: ControllerConfig,
    /// Version this process is running; submitted with every check.
    version: String,
    /// Completion time of the last successful remote check. `None` is the
    /// zero timestamp: the next enabled sync checks immediately.
    last_checked: Mutex<Option<Instant>>,
}

impl SettingController {
    pub fn new(
        store: Arc<dyn SettingStore>,
        checker: Arc<dyn UpgradeChecker>,
        reporter: Arc<dyn Reporter>,
        version: impl Into<String>,
        cfg: ControllerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            checker,
            reporter,
            queue: WorkQueue::new(cfg.queue.clone()),
            cfg,
            version: version.into(),
            last_checked: Mutex::new(None),
        })
    }

    /// Derive the queue key from the name carried by a change notification.
    ///
    /// Names may arrive namespace-qualified (`ns/name`); only the name part
    /// identifies the setting. Anything with more separators is malformed.
    pub fn object_to_key(name: &str) -> Result<String, CoreError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok((*name).to_string()),
            [_namespace, name] if !name.is_empty() => Ok((*name).to_string()),
            _ => Err(CoreError::MalformedKey(name.to_string())),
        }
    }

    /// Feed one add/update/delete notification into the queue.
    ///
    /// A payload no key can be derived from is reported right away and never
    /// enqueued; everything else is deduplicated by the queue.
    pub async fn enqueue(&self, name: &str) {
        match Self::object_to_key(name) {
            Ok(key) => self.queue.add(key).await,
            Err(err) => {
                warn!(object = %name, "discarding unkeyable settings notification");
                self.reporter.report(name, &err);
            }
        }
    }

    /// Run the worker pool until `shutdown` fires, then drain the queue and
    /// stop. In-flight and already-pending work completes; nothing is
    /// cancelled mid-sync.
    pub async fn run(self: &Arc<Self>, shutdown: CancellationToken) {
        info!(workers = self.cfg.workers, version = %self.version, "setting controller started");

        let mut workers = JoinSet::new();
        for _ in 0..self.cfg.workers.max(1) {
            let controller = Arc::clone(self);
            workers.spawn(async move { controller.worker().await });
        }

        shutdown.cancelled().await;
        self.queue.shut_down().await;
        while workers.join_next().await.is_some() {}

        info!("setting controller stopped");
    }

    async fn worker(&self) {
        while let Some(key) = self.queue.get().await {
            let result = self.sync_setting(&key).await;
            self.handle_result(&key, result).await;
            self.queue.done(key).await;
        }
    }

    /// Success forgets the key's failure history; failure requeues with
    /// backoff until the retry budget runs out, then reports and drops.
    async fn handle_result(&self, key: &String, result: Result<(), CoreError>) {
        let Err(err) = result else {
            self.queue.forget(key).await;
            return;
        };

        if self.queue.num_requeues(key).await < self.cfg.max_retries {
            warn!(key = %key, error = %err, "failed to sync setting, requeueing");
            self.queue.add_rate_limited(key.clone()).await;
            return;
        }

        warn!(key = %key, error = %err, "dropping setting out of the queue");
        self.reporter.report(key, &err);
        self.queue.forget(key).await;
    }

    /// Sync one key. Errors come back wrapped with the key so the final
    /// report is self-describing.
    async fn sync_setting(&self, key: &str) -> Result<(), CoreError> {
        self.sync_upgrade_check(key)
            .await
            .map_err(|source| CoreError::Sync {
                key: key.to_string(),
                source,
            })
    }

    /// The enable/disable + debounce state machine.
    ///
    /// Reaching the remote check costs one network round trip and at most
    /// one store write; every other path through here is write-free.
    #[instrument(level = "debug", skip(self))]
    async fn sync_upgrade_check(&self, key: &str) -> Result<(), SyncError> {
        if key != SettingName::UpgradeChecker.as_str() {
            // only the upgrade checker setting is reconciled by this controller
            return Ok(());
        }

        let enabled = self.store.get_as_bool(SettingName::UpgradeChecker).await?;
        let mut latest = self.store.get(SettingName::LatestVersion).await?;

        if !enabled {
            if !latest.value.is_empty() {
                latest.value.clear();
                self.store.update(latest).await?;
            }
            // rearm unconditionally: the next enabled sync must check
            // immediately instead of waiting out a stale interval
            *self.last_checked.lock().await = None;
            return Ok(());
        }

        let now = Instant::now();
        if let Some(at) = *self.last_checked.lock().await {
            if now < at + self.cfg.check_interval {
                debug!(key = %key, "within the debounce window, skipping check");
                return Ok(());
            }
        }

        let old = latest.value.clone();
        latest.value = self.checker.latest_version(&self.version).await?;
        // a failed check returns above without touching the timestamp
        *self.last_checked.lock().await = Some(now);

        if latest.value != old {
            info!(version = %latest.value, "new version is available");
            self.store.update(latest).await?;
        }
        Ok(())
    }
}
