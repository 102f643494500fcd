//! Path-based operation surface offered to the host.
//!
//! | Path | Operations | Effect |
//! |------|------------|--------|
//! | `config` | read, create, update, delete | [`ConfigStore`] CRUD; writes and deletes invalidate the client cache |
//! | `role/{name}` | read, create, update, delete | [`RoleStore`] CRUD |
//! | `role` | list | role names |
//! | `creds/{name}` | read, update | [`CredentialIssuer::issue`] |
//!
//! The host routes each inbound request through [`Backend::handle`] with its
//! own storage handle and cancellation token, and forwards its generic
//! invalidation callback to [`Backend::invalidate`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokenlease_models::{ConfigView, CredentialResponse, InternalCredential, Operation, RoleView};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ClientFactory;
use crate::client_cache::ClientCache;
use crate::config_store::ConfigStore;
use crate::error::EngineError;
use crate::invalidation::InvalidationHooks;
use crate::issuer::CredentialIssuer;
use crate::role_store::RoleStore;
use crate::storage::{CONFIG_KEY, Storage};

// ---------------------------------------------------------------------------
// Help text
// ---------------------------------------------------------------------------

const BACKEND_HELP: &str = "\
The tokenlease secrets backend dynamically generates user tokens.
After mounting this backend, credentials to manage user tokens
must be configured with the \"config\" endpoint.";

const CONFIG_HELP: (&str, &str) = (
    "Configure the backend.",
    "The backend requires credentials for managing tokens with the external API.",
);

const ROLE_HELP: (&str, &str) = (
    "Manages the roles used to generate tokens.",
    "This path allows you to read and write roles used to generate tokens.\n\
     You can configure a role to manage a user's token by setting the username field.",
);

const ROLE_LIST_HELP: (&str, &str) = (
    "List the existing roles in the backend.",
    "Roles will be listed by the role name.",
);

const CREDS_HELP: (&str, &str) = (
    "Generate a token from a specific role.",
    "This path generates tokens based on a particular role.",
);

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendPath {
    /// `config`
    Config,
    /// `role` or `role/`
    RoleList,
    /// `role/{name}`
    Role(String),
    /// `creds/{name}`
    Creds(String),
}

impl BackendPath {
    /// `(synopsis, description)` for this path.
    pub fn help(&self) -> (&'static str, &'static str) {
        match self {
            Self::Config => CONFIG_HELP,
            Self::RoleList => ROLE_LIST_HELP,
            Self::Role(_) => ROLE_HELP,
            Self::Creds(_) => CREDS_HELP,
        }
    }
}

impl FromStr for BackendPath {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim_start_matches('/');
        match path.split_once('/') {
            None if path == CONFIG_KEY => Ok(Self::Config),
            None if path == "role" => Ok(Self::RoleList),
            Some(("role", "")) => Ok(Self::RoleList),
            Some(("role", name)) => Ok(Self::Role(name.to_string())),
            Some(("creds", name)) if !name.is_empty() => Ok(Self::Creds(name.to_string())),
            _ => Err(EngineError::NotFound(format!("path {s}"))),
        }
    }
}

impl fmt::Display for BackendPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => f.write_str(CONFIG_KEY),
            Self::RoleList => f.write_str("role/"),
            Self::Role(name) => write!(f, "role/{name}"),
            Self::Creds(name) => write!(f, "creds/{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// One inbound operation.
#[derive(Debug, Clone)]
pub struct Request {
    /// Operation kind.
    pub operation: Operation,
    /// Target path.
    pub path: BackendPath,
    /// Request body for writes; `Null` otherwise.
    pub data: serde_json::Value,
}

impl Request {
    /// A request with no body.
    pub fn new(operation: Operation, path: BackendPath) -> Self {
        Self {
            operation,
            path,
            data: serde_json::Value::Null,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    fn decode<T: DeserializeOwned + Default>(&self) -> Result<T, EngineError> {
        if self.data.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.data.clone())
            .map_err(|e| EngineError::InvalidArgument(format!("request body for {}: {e}", self.path)))
    }
}

/// Result of a handled operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Config read or write. `None` when unset.
    Config(Option<ConfigView>),
    /// Role read or write. `None` when absent.
    Role(Option<RoleView>),
    /// Role list.
    RoleList(Vec<String>),
    /// Issued credential.
    Credential(CredentialResponse),
    /// Successful delete.
    Deleted,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A mounted backend instance: one client cache, its invalidation wiring,
/// and the stores and issuer that use it.
#[derive(Debug, Clone)]
pub struct Backend {
    cache: Arc<ClientCache>,
    hooks: Arc<InvalidationHooks>,
    config: ConfigStore,
    issuer: CredentialIssuer,
}

impl Backend {
    /// Build a backend whose clients come from `factory`.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        let cache = Arc::new(ClientCache::new(factory));
        let hooks = Arc::new(InvalidationHooks::new().on(CONFIG_KEY, cache.clone()));

        Self {
            config: ConfigStore::new(Arc::clone(&hooks)),
            issuer: CredentialIssuer::new(Arc::clone(&cache)),
            cache,
            hooks,
        }
    }

    /// Backend-level help text.
    pub fn help(&self) -> &'static str {
        BACKEND_HELP
    }

    /// The shared client cache.
    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    /// Host invalidation callback. Only `config` has listeners.
    pub async fn invalidate(&self, key: &str) {
        self.hooks.dispatch(key).await;
    }

    /// Whether the resource at `path` exists, so the host can choose between
    /// create and update.
    ///
    /// # Errors
    ///
    /// Storage failures or a malformed role name.
    pub async fn exists(&self, storage: &dyn Storage, path: &BackendPath) -> Result<bool, EngineError> {
        match path {
            BackendPath::Config => ConfigStore::exists(storage).await,
            BackendPath::Role(name) => Ok(RoleStore::read(storage, name).await?.is_some()),
            BackendPath::RoleList | BackendPath::Creds(_) => Ok(true),
        }
    }

    /// Route `request` to its handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns, or
    /// [`EngineError::UnsupportedOperation`] for an operation the path does
    /// not serve.
    pub async fn handle(
        &self,
        storage: &dyn Storage,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, EngineError> {
        debug!(operation = %request.operation, path = %request.path, "handling request");

        match (&request.path, request.operation) {
            (BackendPath::Config, Operation::Read) => {
                ConfigStore::view(storage).await.map(Response::Config)
            }
            (BackendPath::Config, op @ (Operation::Create | Operation::Update)) => {
                let patch = request.decode()?;
                let view = self.config.write(storage, op, patch).await?;
                Ok(Response::Config(Some(view)))
            }
            (BackendPath::Config, Operation::Delete) => {
                self.config.delete(storage).await?;
                Ok(Response::Deleted)
            }

            (BackendPath::RoleList, Operation::List | Operation::Read) => {
                RoleStore::list(storage).await.map(Response::RoleList)
            }

            (BackendPath::Role(name), Operation::Read) => RoleStore::read(storage, name)
                .await
                .map(|role| Response::Role(role.as_ref().map(|r| r.view()))),
            (BackendPath::Role(name), Operation::Create | Operation::Update) => {
                let patch = request.decode()?;
                let role = RoleStore::write(storage, name, patch).await?;
                Ok(Response::Role(Some(role.view())))
            }
            (BackendPath::Role(name), Operation::Delete) => {
                RoleStore::delete(storage, name).await?;
                Ok(Response::Deleted)
            }

            (BackendPath::Creds(name), Operation::Read | Operation::Update) => self
                .issue(storage, name, cancel)
                .await
                .map(Response::Credential),

            (path, operation) => Err(EngineError::UnsupportedOperation {
                operation,
                path: path.to_string(),
            }),
        }
    }

    /// Issue a credential for `role_name`. Same as a read of `creds/{name}`.
    ///
    /// # Errors
    ///
    /// See [`CredentialIssuer::issue`].
    pub async fn issue(
        &self,
        storage: &dyn Storage,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<CredentialResponse, EngineError> {
        self.issuer.issue(storage, role_name, cancel).await
    }

    /// Revoke a credential previously issued by this backend.
    ///
    /// # Errors
    ///
    /// See [`CredentialIssuer::revoke`].
    pub async fn revoke(
        &self,
        storage: &dyn Storage,
        internal: &InternalCredential,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.issuer.revoke(storage, internal, cancel).await
    }
}
