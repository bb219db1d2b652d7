use async_trait::async_trait;
use thiserror::Error;

/// Asks a remote service which version is current.
///
/// Implementations perform one network round trip per call; the controller
/// decides when calling is worth it. The concrete HTTP client lives in its
/// own crate and is plugged in at construction time.
#[async_trait]
pub trait UpgradeChecker: Send + Sync {
    /// Submit the running version, get back the version the responder tags
    /// as latest.
    async fn latest_version(&self, current: &str) -> Result<String, CheckError>;
}

/// All variants are retryable from the controller's point of view: a
/// response without the expected tag may simply predate the next tagged
/// release.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("upgrade check request failed: {0}")]
    Request(String),

    #[error("cannot decode upgrade check response: {0}")]
    Decode(String),

    #[error("no version tagged \"latest\" in upgrade check response")]
    NoLatest,
}
