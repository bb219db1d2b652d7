use thiserror::Error;

use crate::checker::CheckError;
use crate::store::StoreError;

/// Failure inside one sync invocation, before key context is attached.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Check(#[from] CheckError),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to sync setting {key}: {source}")]
    Sync { key: String, source: SyncError },

    #[error("cannot derive a key from settings object {0:?}")]
    MalformedKey(String),
}
