//! Persistence of the single external-service configuration.
//!
//! Writes are merge-then-validate: load the stored value (or start blank on
//! create), apply the supplied fields, validate the result, persist, then
//! notify the invalidation listeners for [`CONFIG_KEY`]. Notification only
//! happens after the write is durable, so the next credential request sees
//! the new configuration.

use std::sync::Arc;

use tokenlease_models::{ConfigPatch, ConfigView, Configuration, Operation};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::invalidation::InvalidationHooks;
use crate::storage::{CONFIG_KEY, Storage, get_json, put_json};

/// Reads and writes the configuration entry.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    hooks: Arc<InvalidationHooks>,
}

impl ConfigStore {
    /// Create a store that notifies `hooks` after every change.
    pub fn new(hooks: Arc<InvalidationHooks>) -> Self {
        Self { hooks }
    }

    /// Load the full configuration, password included.
    ///
    /// # Errors
    ///
    /// Only storage failures; an unset configuration is `Ok(None)`.
    pub async fn read(storage: &dyn Storage) -> Result<Option<Configuration>, EngineError> {
        get_json(storage, CONFIG_KEY).await
    }

    /// Load the public projection of the configuration.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub async fn view(storage: &dyn Storage) -> Result<Option<ConfigView>, EngineError> {
        Ok(Self::read(storage).await?.as_ref().map(Configuration::view))
    }

    /// Whether a configuration is stored.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub async fn exists(storage: &dyn Storage) -> Result<bool, EngineError> {
        storage
            .get(CONFIG_KEY)
            .await
            .map(|entry| entry.is_some())
            .map_err(|e| EngineError::storage("existence check", CONFIG_KEY, e))
    }

    /// Merge `patch` onto the stored configuration and persist it.
    ///
    /// `Create` starts from a blank configuration when none exists; `Update`
    /// requires one to exist.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an update with nothing stored,
    /// [`EngineError::Validation`] if any field ends up empty, or a storage
    /// failure.
    pub async fn write(
        &self,
        storage: &dyn Storage,
        operation: Operation,
        patch: ConfigPatch,
    ) -> Result<ConfigView, EngineError> {
        let base = match Self::read(storage).await? {
            Some(existing) => existing,
            None if operation == Operation::Create => Configuration::default(),
            None => return Err(EngineError::NotFound(CONFIG_KEY.to_string())),
        };

        let merged = patch.apply(base);
        if let Err(e) = merged.validate() {
            warn!(error = %e, "rejected configuration write");
            return Err(e.into());
        }

        put_json(storage, CONFIG_KEY, &merged).await?;
        info!(username = %merged.username, url = %merged.url, "configuration written");

        self.hooks.dispatch(CONFIG_KEY).await;
        Ok(merged.view())
    }

    /// Remove the configuration. Deleting an unset configuration succeeds.
    ///
    /// # Errors
    ///
    /// Only storage failures; listeners are not notified in that case.
    pub async fn delete(&self, storage: &dyn Storage) -> Result<(), EngineError> {
        storage
            .delete(CONFIG_KEY)
            .await
            .map_err(|e| EngineError::storage("delete", CONFIG_KEY, e))?;
        info!("configuration deleted");

        self.hooks.dispatch(CONFIG_KEY).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> ConfigStore {
        ConfigStore::new(Arc::new(InvalidationHooks::new()))
    }

    fn alice() -> ConfigPatch {
        Configuration::new("alice", "secret", "https://api.example.com").into()
    }

    #[tokio::test]
    async fn read_unset_is_none() {
        let storage = MemoryStorage::new();
        assert!(ConfigStore::read(&storage).await.unwrap().is_none());
        assert!(ConfigStore::view(&storage).await.unwrap().is_none());
        assert!(!ConfigStore::exists(&storage).await.unwrap());
    }

    #[tokio::test]
    async fn create_then_view_hides_password() {
        let storage = MemoryStorage::new();
        let view = store()
            .write(&storage, Operation::Create, alice())
            .await
            .unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.url, "https://api.example.com");

        let read = ConfigStore::view(&storage).await.unwrap().unwrap();
        assert_eq!(read, view);

        let stored = ConfigStore::read(&storage).await.unwrap().unwrap();
        assert_eq!(stored.password, "secret");
    }

    #[tokio::test]
    async fn update_without_config_is_not_found() {
        let storage = MemoryStorage::new();
        let err = store()
            .write(&storage, Operation::Update, alice())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn partial_update_merges() {
        let storage = MemoryStorage::new();
        let store = store();
        store.write(&storage, Operation::Create, alice()).await.unwrap();

        let patch = ConfigPatch {
            password: Some("rotated".into()),
            ..Default::default()
        };
        store.write(&storage, Operation::Update, patch).await.unwrap();

        let stored = ConfigStore::read(&storage).await.unwrap().unwrap();
        assert_eq!(stored.username, "alice");
        assert_eq!(stored.password, "rotated");
    }

    #[tokio::test]
    async fn incomplete_create_is_rejected_and_not_stored() {
        let storage = MemoryStorage::new();
        let patch = ConfigPatch {
            username: Some("alice".into()),
            url: Some("https://api.example.com".into()),
            ..Default::default()
        };
        let err = store()
            .write(&storage, Operation::Create, patch)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(!err.to_string().contains("secret"));
        assert!(!ConfigStore::exists(&storage).await.unwrap());
    }

    #[tokio::test]
    async fn clearing_a_field_is_rejected_and_keeps_old_value() {
        let storage = MemoryStorage::new();
        let store = store();
        store.write(&storage, Operation::Create, alice()).await.unwrap();

        let patch = ConfigPatch {
            url: Some(String::new()),
            ..Default::default()
        };
        assert!(store.write(&storage, Operation::Update, patch).await.is_err());

        let stored = ConfigStore::read(&storage).await.unwrap().unwrap();
        assert_eq!(stored.url, "https://api.example.com");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = MemoryStorage::new();
        let store = store();
        store.delete(&storage).await.unwrap();

        store.write(&storage, Operation::Create, alice()).await.unwrap();
        store.delete(&storage).await.unwrap();
        store.delete(&storage).await.unwrap();
        assert!(ConfigStore::read(&storage).await.unwrap().is_none());
    }
}
