//! # tokenlease engine
//!
//! Core of a dynamic-secrets backend: it stores one external-service
//! configuration and any number of roles, and issues short-lived credentials
//! for a role by signing in to the external service through a single,
//! lazily built, shared client.
//!
//! The engine provides:
//!
//! * [`Backend`]: the path-based operation surface the host calls into,
//!   plus the host's invalidation hook.
//! * [`ConfigStore`] / [`RoleStore`]: merge-then-validate persistence.
//! * [`ClientCache`]: at most one live [`ExternalServiceClient`], rebuilt
//!   after every configuration change.
//! * [`CredentialIssuer`]: role → sign-in → [`CredentialResponse`].
//! * [`Storage`]: the key-value collaborator, with [`MemoryStorage`] for
//!   local use.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tokenlease_engine::{Backend, BackendPath, MemoryStorage, Request, Response, StubClientFactory};
//! use tokenlease_models::Operation;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), tokenlease_engine::EngineError> {
//! let backend = Backend::new(Arc::new(StubClientFactory));
//! let storage = MemoryStorage::new();
//! let cancel = CancellationToken::new();
//!
//! let config = serde_json::json!({
//!     "username": "alice",
//!     "password": "secret",
//!     "url": "https://api.example.com",
//! });
//! backend
//!     .handle(&storage, Request::new(Operation::Create, BackendPath::Config).with_data(config), &cancel)
//!     .await?;
//!
//! let role = serde_json::json!({ "username": "svc-reader", "ttl": 3600, "max_ttl": 7200 });
//! backend
//!     .handle(&storage, Request::new(Operation::Create, "role/reader".parse()?).with_data(role), &cancel)
//!     .await?;
//!
//! let Response::Credential(creds) = backend
//!     .handle(&storage, Request::new(Operation::Read, "creds/reader".parse()?), &cancel)
//!     .await?
//! else {
//!     unreachable!()
//! };
//! assert_eq!(creds.ttl.as_secs(), 3600);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod client_cache;
pub mod config_store;
pub mod error;
pub mod invalidation;
pub mod issuer;
pub mod role_store;
pub mod storage;

pub use backend::{Backend, BackendPath, Request, Response};
pub use client::{ClientFactory, ExternalServiceClient, StubClient, StubClientFactory};
pub use client_cache::ClientCache;
pub use config_store::ConfigStore;
pub use error::EngineError;
pub use invalidation::{Invalidate, InvalidationHooks};
pub use issuer::CredentialIssuer;
pub use role_store::RoleStore;
pub use storage::{CONFIG_KEY, MemoryStorage, ROLE_PREFIX, Storage, StorageError};

// Re-export the model types used in engine signatures.
pub use tokenlease_models::{
    ConfigPatch, ConfigView, Configuration, CredentialResponse, ExternalToken,
    InternalCredential, Operation, PublicCredential, RoleEntry, RolePatch, RoleView,
};
