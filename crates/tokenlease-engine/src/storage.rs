//! Key-value storage collaborator.
//!
//! The engine persists two namespaces through [`Storage`]: the single key
//! [`CONFIG_KEY`] and one key per role under [`ROLE_PREFIX`]. The host owns
//! the real store; [`MemoryStorage`] is an in-process implementation used by
//! the development server and the tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::EngineError;

/// Storage key holding the serialized configuration.
pub const CONFIG_KEY: &str = "config";

/// Prefix of every role key (`role/{name}`).
pub const ROLE_PREFIX: &str = "role/";

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    /// Create a storage error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An ordered key-value store, atomic per key.
///
/// `list` returns the key suffixes directly below `prefix` in lexical
/// order. Deeper keys are collapsed into a single `child/` entry.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the value at `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Enumerate keys under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Read and decode a JSON entry.
pub(crate) async fn get_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, EngineError> {
    let Some(bytes) = storage
        .get(key)
        .await
        .map_err(|e| EngineError::storage("read", key, e))?
    else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| EngineError::storage("decode", key, StorageError::new(e.to_string())))
}

/// Encode and write a JSON entry.
pub(crate) async fn put_json<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), EngineError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| EngineError::storage("encode", key, StorageError::new(e.to_string())))?;

    storage
        .put(key, bytes)
        .await
        .map_err(|e| EngineError::storage("write", key, e))
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-memory [`Storage`] backed by a sorted map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .map(|k| {
                let rest = &k[prefix.len()..];
                match rest.find('/') {
                    Some(i) => rest[..=i].to_string(),
                    None => rest.to_string(),
                }
            })
            .collect();
        keys.dedup();
        Ok(keys)
    }
}
