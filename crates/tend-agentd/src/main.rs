use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tend_check::{DEFAULT_CHECK_URL, HttpChecker};
use tend_core::prelude::*;
use tend_model::{Setting, SettingName};
use tend_observe::{LoggerConfig, LoggerLevel, init_logger};

/// Version the daemon reports to the upgrade responder.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often every watched setting is re-enqueued even without changes.
/// Stands in for an external change-notification source.
const RESYNC_PERIOD: Duration = Duration::from_secs(60 * 60);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) logger
    let cfg = LoggerConfig {
        level: LoggerLevel::new("info")?,
        ..Default::default()
    };
    init_logger(&cfg)?;
    info!("logger initialized");

    // 2) settings store (in-process demo store)
    let store = Arc::new(MemoryStore::new());
    store
        .seed(Setting::new(SettingName::UpgradeChecker, "true"))
        .await;
    store.seed(Setting::new(SettingName::LatestVersion, "")).await;

    // 3) upgrade checker client
    let checker = Arc::new(HttpChecker::new(DEFAULT_CHECK_URL)?);

    // 4) controller
    let controller = SettingController::new(
        store,
        checker,
        Arc::new(LogReporter),
        VERSION,
        ControllerConfig::default(),
    );

    // 5) periodic resync enqueue; the first tick fires right away
    let shutdown = CancellationToken::new();
    let resync = {
        let controller = Arc::clone(&controller);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(RESYNC_PERIOD);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {
                        for name in [SettingName::UpgradeChecker, SettingName::LatestVersion] {
                            controller.enqueue(name.as_str()).await;
                        }
                    }
                }
            }
        })
    };

    // 6) run until ctrl-c, then drain
    let run = {
        let controller = Arc::clone(&controller);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { controller.run(shutdown).await })
    };

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining");
    shutdown.cancel();

    resync.await?;
    run.await?;
    Ok(())
}
