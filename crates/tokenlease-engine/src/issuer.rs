//! Credential issuance.
//!
//! `issue` turns a role name into a [`CredentialResponse`]:
//!
//! 1. load the role,
//! 2. take the shared client from the [`ClientCache`],
//! 3. sign in as the role's username,
//! 4. split the token into public and internal halves with the role's lease.
//!
//! Nothing is persisted; the host's lease tracker keeps the internal half
//! and hands it back to [`CredentialIssuer::revoke`] when the lease ends.
//! There is no retry here: one failed sign-in fails the request.

use std::sync::Arc;

use tokenlease_models::{CredentialResponse, InternalCredential};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client_cache::ClientCache;
use crate::error::EngineError;
use crate::role_store::RoleStore;
use crate::storage::Storage;

/// Issues and revokes role-bound credentials.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    cache: Arc<ClientCache>,
}

impl CredentialIssuer {
    /// Create an issuer drawing clients from `cache`.
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self { cache }
    }

    /// Issue a credential for `role_name`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidArgument`] for a malformed role name
    /// - [`EngineError::NotFound`] if the role does not exist
    /// - [`EngineError::Configuration`] if the backend is not configured
    /// - [`EngineError::Upstream`] if sign-in fails or yields an empty token
    /// - [`EngineError::Cancelled`] if `cancel` fires first
    pub async fn issue(
        &self,
        storage: &dyn Storage,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<CredentialResponse, EngineError> {
        let role = RoleStore::read(storage, role_name)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("role {role_name}")))?;

        let client = self.cache.get(storage, cancel).await?;

        let token = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            signed_in = client.sign_in(&role.username) => signed_in.map_err(|e| {
                warn!(role = %role.name, error = %e, "sign-in failed");
                upstream("sign-in", &role.name, e)
            })?,
        };

        if token.token.is_empty() {
            warn!(role = %role.name, "sign-in returned an empty token");
            return Err(EngineError::Upstream(format!(
                "sign-in for role {} returned an empty token",
                role.name
            )));
        }

        info!(
            role = %role.name,
            username = %role.username,
            token_id = %token.token_id,
            generation = self.cache.generation(),
            "credential issued"
        );

        Ok(CredentialResponse::from_token(token, &role))
    }

    /// Sign the token in `internal` out of the external service.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`], [`EngineError::Upstream`] or
    /// [`EngineError::Cancelled`].
    pub async fn revoke(
        &self,
        storage: &dyn Storage,
        internal: &InternalCredential,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let client = self.cache.get(storage, cancel).await?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            signed_out = client.sign_out(&internal.token) => signed_out.map_err(|e| {
                warn!(error = %e, "sign-out failed");
                upstream("sign-out", "credential", e)
            })?,
        }

        info!("credential revoked");
        Ok(())
    }
}

/// Report a client failure as [`EngineError::Upstream`] with context.
/// Cancellation passes through unchanged.
fn upstream(action: &str, subject: impl std::fmt::Display, e: EngineError) -> EngineError {
    match e {
        EngineError::Cancelled => EngineError::Cancelled,
        EngineError::Upstream(message) => {
            EngineError::Upstream(format!("{action} for {subject}: {message}"))
        }
        other => EngineError::Upstream(format!("{action} for {subject}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokenlease_models::{Configuration, ExternalToken, RolePatch};

    use super::*;
    use crate::client::{ClientFactory, ExternalServiceClient, StubClientFactory};
    use crate::storage::{CONFIG_KEY, MemoryStorage};

    /// Scripted upstream for failure paths.
    #[derive(Default)]
    struct ScriptedClient {
        empty_token: bool,
        reject: bool,
        misconfigured: bool,
        hang: bool,
        sign_outs: AtomicUsize,
    }

    #[async_trait]
    impl ExternalServiceClient for ScriptedClient {
        async fn sign_in(&self, username: &str) -> Result<ExternalToken, EngineError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.reject {
                return Err(EngineError::Upstream("401 unauthorized".into()));
            }
            if self.misconfigured {
                return Err(EngineError::Configuration("missing tenant".into()));
            }
            Ok(ExternalToken {
                token: if self.empty_token { String::new() } else { "tok".into() },
                token_id: "tid".into(),
                user_id: "uid".into(),
                username: username.into(),
            })
        }

        async fn sign_out(&self, _token: &str) -> Result<(), EngineError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(EngineError::Upstream("500".into()));
            }
            Ok(())
        }
    }

    struct Fixed(Arc<ScriptedClient>);

    #[async_trait]
    impl ClientFactory for Fixed {
        async fn build(
            &self,
            _config: &Configuration,
        ) -> Result<Arc<dyn ExternalServiceClient>, EngineError> {
            Ok(self.0.clone())
        }
    }

    async fn setup(factory: Arc<dyn ClientFactory>) -> (CredentialIssuer, MemoryStorage) {
        let storage = MemoryStorage::new();
        let config = Configuration::new("alice", "secret", "https://api.example.com");
        storage
            .put(CONFIG_KEY, serde_json::to_vec(&config).unwrap())
            .await
            .unwrap();
        RoleStore::write(
            &storage,
            "reader",
            RolePatch {
                username: Some("svc-reader".into()),
                ttl: Some(Duration::from_secs(3600)),
                max_ttl: Some(Duration::from_secs(7200)),
            },
        )
        .await
        .unwrap();

        let issuer = CredentialIssuer::new(Arc::new(ClientCache::new(factory)));
        (issuer, storage)
    }

    #[tokio::test]
    async fn issue_returns_split_response() {
        let (issuer, storage) = setup(Arc::new(StubClientFactory)).await;
        let resp = issuer
            .issue(&storage, "reader", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!resp.public.token.is_empty());
        assert_eq!(resp.public.username, "svc-reader");
        assert_eq!(resp.internal.token, resp.public.token);
        assert_eq!(resp.ttl, Duration::from_secs(3600));
        assert_eq!(resp.max_ttl, Duration::from_secs(7200));
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let (issuer, storage) = setup(Arc::new(StubClientFactory)).await;
        let err = issuer
            .issue(&storage, "ghost", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_role_name_is_invalid_argument() {
        let (issuer, storage) = setup(Arc::new(StubClientFactory)).await;
        let err = issuer
            .issue(&storage, "", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejected_sign_in_is_upstream_with_context() {
        let client = Arc::new(ScriptedClient {
            reject: true,
            ..Default::default()
        });
        let (issuer, storage) = setup(Arc::new(Fixed(client))).await;
        let err = issuer
            .issue(&storage, "reader", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "external service error: sign-in for reader: 401 unauthorized"
        );
    }

    #[tokio::test]
    async fn any_sign_in_failure_is_upstream() {
        let client = Arc::new(ScriptedClient {
            misconfigured: true,
            ..Default::default()
        });
        let (issuer, storage) = setup(Arc::new(Fixed(client))).await;
        let err = issuer
            .issue(&storage, "reader", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upstream(_)));
        assert_eq!(
            err.to_string(),
            "external service error: sign-in for reader: backend not configured: missing tenant"
        );
    }

    #[tokio::test]
    async fn empty_token_is_upstream() {
        let client = Arc::new(ScriptedClient {
            empty_token: true,
            ..Default::default()
        });
        let (issuer, storage) = setup(Arc::new(Fixed(client))).await;
        assert!(matches!(
            issuer
                .issue(&storage, "reader", &CancellationToken::new())
                .await,
            Err(EngineError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_aborts_hanging_sign_in() {
        let client = Arc::new(ScriptedClient {
            hang: true,
            ..Default::default()
        });
        let (issuer, storage) = setup(Arc::new(Fixed(client))).await;
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let err = issuer.issue(&storage, "reader", &cancel).await.unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[tokio::test]
    async fn revoke_signs_out_internal_token() {
        let client = Arc::new(ScriptedClient::default());
        let (issuer, storage) = setup(Arc::new(Fixed(client.clone()))).await;
        let cancel = CancellationToken::new();

        let resp = issuer.issue(&storage, "reader", &cancel).await.unwrap();
        issuer.revoke(&storage, &resp.internal, &cancel).await.unwrap();
        assert_eq!(client.sign_outs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_revoke_is_upstream() {
        let client = Arc::new(ScriptedClient {
            reject: true,
            ..Default::default()
        });
        let (issuer, storage) = setup(Arc::new(Fixed(client))).await;
        let internal = InternalCredential {
            token: "tok".into(),
        };
        assert!(matches!(
            issuer
                .revoke(&storage, &internal, &CancellationToken::new())
                .await,
            Err(EngineError::Upstream(_))
        ));
    }
}
