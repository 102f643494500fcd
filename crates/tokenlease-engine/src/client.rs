//! External-service client collaborator.
//!
//! The engine only needs two capabilities from the external token API:
//! signing a user in to obtain a token, and signing a token out. Both are
//! behind [`ExternalServiceClient`]; instances are built from a
//! [`Configuration`] by a [`ClientFactory`] so the cache can rebuild them
//! after reconfiguration.
//!
//! [`StubClient`] is the built-in implementation. It performs no network
//! I/O and mints opaque random tokens.

use std::sync::Arc;

use async_trait::async_trait;
use tokenlease_models::{Configuration, ExternalToken};
use tracing::debug;

use crate::error::EngineError;

/// Capability to sign in to and out of the external service.
#[async_trait]
pub trait ExternalServiceClient: Send + Sync {
    /// Obtain a fresh token for `username`.
    async fn sign_in(&self, username: &str) -> Result<ExternalToken, EngineError>;

    /// Invalidate `token` on the external service.
    async fn sign_out(&self, token: &str) -> Result<(), EngineError>;
}

/// Builds clients from the stored configuration.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Construct a client for `config`.
    ///
    /// Called with the cache's exclusive lock held; implementations should
    /// bound any connection attempt with their own timeout.
    async fn build(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn ExternalServiceClient>, EngineError>;
}

// ---------------------------------------------------------------------------
// StubClient
// ---------------------------------------------------------------------------

/// In-process client that mints UUID-based tokens.
#[derive(Debug, Clone)]
pub struct StubClient {
    url: String,
}

impl StubClient {
    /// Validate `config` and create a client for it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if any field is empty.
    pub fn new(config: &Configuration) -> Result<Self, EngineError> {
        let undefined = |field: &str| {
            EngineError::Configuration(format!("client {field} was not defined"))
        };

        if config.username.is_empty() {
            return Err(undefined("username"));
        }
        if config.password.is_empty() {
            return Err(undefined("password"));
        }
        if config.url.is_empty() {
            return Err(undefined("URL"));
        }

        Ok(Self {
            url: config.url.clone(),
        })
    }

    /// Base URL this client was configured with.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ExternalServiceClient for StubClient {
    async fn sign_in(&self, username: &str) -> Result<ExternalToken, EngineError> {
        if username.is_empty() {
            return Err(EngineError::Upstream("sign-in requires a username".into()));
        }

        let token = ExternalToken {
            token: uuid::Uuid::new_v4().simple().to_string(),
            token_id: uuid::Uuid::new_v4().to_string(),
            user_id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
        };
        debug!(url = %self.url, username, token_id = %token.token_id, "stub sign-in");
        Ok(token)
    }

    async fn sign_out(&self, token: &str) -> Result<(), EngineError> {
        if token.is_empty() {
            return Err(EngineError::Upstream("cannot sign out an empty token".into()));
        }
        debug!(url = %self.url, "stub sign-out");
        Ok(())
    }
}

/// [`ClientFactory`] producing [`StubClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubClientFactory;

#[async_trait]
impl ClientFactory for StubClientFactory {
    async fn build(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn ExternalServiceClient>, EngineError> {
        Ok(Arc::new(StubClient::new(config)?))
    }
}
