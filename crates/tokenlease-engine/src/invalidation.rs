//! Key-scoped invalidation hooks.
//!
//! The host calls `invalidate(key)` whenever it decides cached state tied to
//! `key` is stale. [`InvalidationHooks`] routes that call to the listeners
//! registered for exactly that key and ignores everything else.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

/// Something that holds state derived from a storage key.
#[async_trait]
pub trait Invalidate: Send + Sync {
    /// Drop any state derived from the key this listener is registered on.
    async fn invalidate(&self);
}

/// Registry of invalidation listeners keyed by storage key.
#[derive(Default)]
pub struct InvalidationHooks {
    listeners: HashMap<String, Vec<Arc<dyn Invalidate>>>,
}

impl InvalidationHooks {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `key`.
    #[must_use]
    pub fn on(mut self, key: impl Into<String>, listener: Arc<dyn Invalidate>) -> Self {
        self.listeners.entry(key.into()).or_default().push(listener);
        self
    }

    /// Notify every listener registered for `key`. Returns how many ran.
    pub async fn dispatch(&self, key: &str) -> usize {
        let Some(listeners) = self.listeners.get(key) else {
            debug!(key, "no invalidation listeners");
            return 0;
        };

        for listener in listeners {
            listener.invalidate().await;
        }
        debug!(key, count = listeners.len(), "invalidation dispatched");
        listeners.len()
    }
}

impl std::fmt::Debug for InvalidationHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.listeners.keys().collect();
        keys.sort();
        f.debug_struct("InvalidationHooks")
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Invalidate for Counter {
        async fn invalidate(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dispatch_only_matching_key() {
        let counter = Arc::new(Counter::default());
        let hooks = InvalidationHooks::new().on("config", counter.clone());

        assert_eq!(hooks.dispatch("role/reader").await, 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        assert_eq!(hooks.dispatch("config").await, 1);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn multiple_listeners_on_one_key() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let hooks = InvalidationHooks::new()
            .on("config", a.clone())
            .on("config", b.clone());

        assert_eq!(hooks.dispatch("config").await, 2);
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }
}
