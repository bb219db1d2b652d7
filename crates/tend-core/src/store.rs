use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use tend_model::{ModelError, Setting, SettingName};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("setting not found: {0}")]
    NotFound(SettingName),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("settings backend error: {0}")]
    Backend(String),
}

/// Handle over the persistent settings store.
///
/// The controller treats reads and writes as strongly consistent for its own
/// use but assumes no isolation from other writers; settings are
/// last-writer-wins.
#[async_trait]
pub trait SettingStore: Send + Sync {
    /// Fetch one setting.
    async fn get(&self, name: SettingName) -> Result<Setting, StoreError>;

    /// Persist `setting`. Returns the stored value.
    async fn update(&self, setting: Setting) -> Result<Setting, StoreError>;

    /// Fetch a setting and interpret its value as a boolean flag.
    async fn get_as_bool(&self, name: SettingName) -> Result<bool, StoreError> {
        let setting = self.get(name).await?;
        Ok(setting.as_bool()?)
    }
}

/// In-process [`SettingStore`] used by tests and the demo daemon.
#[derive(Default)]
pub struct MemoryStore {
    settings: RwLock<HashMap<SettingName, Setting>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a setting outside the `update` path.
    pub async fn seed(&self, setting: Setting) {
        self.settings.write().await.insert(setting.name, setting);
    }
}

#[async_trait]
impl SettingStore for MemoryStore {
    async fn get(&self, name: SettingName) -> Result<Setting, StoreError> {
        self.settings
            .read()
            .await
            .get(&name)
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }

    async fn update(&self, setting: Setting) -> Result<Setting, StoreError> {
        self.settings
            .write()
            .await
            .insert(setting.name, setting.clone());
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, SettingStore, StoreError};
    use tend_model::{Setting, SettingName};

    #[tokio::test]
    async fn get_returns_not_found_for_missing_setting() {
        let store = MemoryStore::new();

        let err = store.get(SettingName::LatestVersion).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_is_last_writer_wins() {
        let store = MemoryStore::new();

        store
            .update(Setting::new(SettingName::LatestVersion, "v1.0.0"))
            .await
            .unwrap();
        store
            .update(Setting::new(SettingName::LatestVersion, "v1.1.0"))
            .await
            .unwrap();

        let got = store.get(SettingName::LatestVersion).await.unwrap();
        assert_eq!(got.value, "v1.1.0");
    }

    #[tokio::test]
    async fn get_as_bool_parses_and_rejects() {
        let store = MemoryStore::new();
        store
            .seed(Setting::new(SettingName::UpgradeChecker, "true"))
            .await;

        assert!(store.get_as_bool(SettingName::UpgradeChecker).await.unwrap());

        store
            .seed(Setting::new(SettingName::UpgradeChecker, "maybe"))
            .await;
        let err = store.get_as_bool(SettingName::UpgradeChecker).await;
        assert!(matches!(err, Err(StoreError::Model(_))));
    }
}
