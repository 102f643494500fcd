//! Lazily built, shared external-service client.
//!
//! [`ClientCache`] holds at most one live client. Lookups take the shared
//! lock; construction happens entirely inside one exclusive critical section
//! (re-check, read configuration, build, install), so racing callers never
//! build twice and nobody can overwrite an installed client.
//!
//! Invalidation clears the slot under the same lock. Because config writes
//! only notify after the new value is persisted, the first `get` after an
//! invalidation always builds from the current configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientFactory, ExternalServiceClient};
use crate::config_store::ConfigStore;
use crate::error::EngineError;
use crate::invalidation::Invalidate;
use crate::storage::Storage;

struct CachedClient {
    client: Arc<dyn ExternalServiceClient>,
    generation: u64,
}

/// Owner of the single live [`ExternalServiceClient`].
pub struct ClientCache {
    factory: Arc<dyn ClientFactory>,
    slot: RwLock<Option<CachedClient>>,
    generation: AtomicU64,
}

impl ClientCache {
    /// An empty cache that builds clients with `factory`.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the live client, building one from the stored configuration if
    /// the cache is empty.
    ///
    /// If `cancel` fires while waiting for the lock or during construction,
    /// nothing is installed and the next caller starts over.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if no configuration is stored or it
    /// cannot build a client, [`EngineError::Cancelled`], or a storage
    /// failure.
    pub async fn get(
        &self,
        storage: &dyn Storage,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn ExternalServiceClient>, EngineError> {
        if let Some(cached) = self.slot.read().await.as_ref() {
            debug!(generation = cached.generation, "client cache hit");
            return Ok(Arc::clone(&cached.client));
        }

        let mut slot = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            guard = self.slot.write() => guard,
        };

        // Another caller may have built one while we waited.
        if let Some(cached) = slot.as_ref() {
            debug!(generation = cached.generation, "client built by concurrent caller");
            return Ok(Arc::clone(&cached.client));
        }

        let config = ConfigStore::read(storage)
            .await?
            .ok_or_else(|| EngineError::Configuration("not configured".into()))?;
        config
            .validate()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        let client = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("client construction cancelled");
                return Err(EngineError::Cancelled);
            }
            built = self.factory.build(&config) => built?,
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = Some(CachedClient {
            client: Arc::clone(&client),
            generation,
        });
        info!(generation, url = %config.url, "external service client constructed");

        Ok(client)
    }

    /// Drop the live client; the next [`get`](Self::get) rebuilds it.
    pub async fn invalidate(&self) {
        if let Some(old) = self.slot.write().await.take() {
            info!(generation = old.generation, "external service client invalidated");
        }
    }

    /// Number of clients built so far. The live client, if any, carries
    /// this generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a client is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Invalidate for ClientCache {
    async fn invalidate(&self) {
        ClientCache::invalidate(self).await;
    }
}
