//! Reconciliation engine: the setting controller, its worker loop, and the
//! trait seams it consumes (settings store, upgrade checker, reporter).
pub mod checker;
pub mod controller;
pub mod error;
pub mod report;
pub mod store;

pub mod prelude {
    pub use crate::checker::{CheckError, UpgradeChecker};
    pub use crate::controller::{ControllerConfig, SettingController};
    pub use crate::error::{CoreError, SyncError};
    pub use crate::report::{LogReporter, Reporter};
    pub use crate::store::{MemoryStore, SettingStore, StoreError};
}
