//! HTTP surface of the development host.
//!
//! | Route | Methods | Backend operation |
//! |-------|---------|-------------------|
//! | `/v1/config` | GET, POST, PUT, DELETE | `config` |
//! | `/v1/role` | GET | list `role/` |
//! | `/v1/role/{name}` | GET, POST, PUT, DELETE | `role/{name}` |
//! | `/v1/creds/{name}` | GET, POST | `creds/{name}`, registers a lease |
//! | `/v1/leases/{lease_id}` | GET | lease metadata |
//! | `/v1/leases/{lease_id}/revoke` | POST | sign-out with the stored internal token |
//! | `/v1/help` | GET | help text for every path |
//!
//! Successful reads and writes answer `{"data": …}`; an absent config or
//! role answers `{"data": null}`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokenlease_engine::{Backend, BackendPath, MemoryStorage, Request, Response};
use tokenlease_models::Operation;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lease::{LeaseInfo, LeaseTable};

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
pub struct AppState {
    /// The mounted backend.
    pub backend: Backend,
    /// Backend storage.
    pub storage: MemoryStorage,
    /// Live leases.
    pub leases: LeaseTable,
    /// Host configuration.
    pub config: ServerConfig,
    /// Cancelled on shutdown; every request runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Fresh state with empty storage and no leases.
    pub fn new(backend: Backend, config: ServerConfig, shutdown: CancellationToken) -> Self {
        Self {
            backend,
            storage: MemoryStorage::new(),
            leases: LeaseTable::default(),
            config,
            shutdown,
        }
    }

    async fn run(
        &self,
        operation: Operation,
        path: BackendPath,
        data: Value,
    ) -> Result<Response, ServerError> {
        let cancel = self.shutdown.child_token();
        let request = Request::new(operation, path).with_data(data);
        Ok(self.backend.handle(&self.storage, request, &cancel).await?)
    }

    /// Create when absent, update otherwise.
    async fn write(&self, path: BackendPath, data: Value) -> Result<Response, ServerError> {
        let operation = if self.backend.exists(&self.storage, &path).await? {
            Operation::Update
        } else {
            Operation::Create
        };
        self.run(operation, path, data).await
    }
}

type Shared = State<Arc<AppState>>;

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/v1/config",
            get(read_config)
                .post(write_config)
                .put(write_config)
                .delete(delete_config),
        )
        .route("/v1/role", get(list_roles))
        .route(
            "/v1/role/{name}",
            get(read_role)
                .post(write_role)
                .put(write_role)
                .delete(delete_role),
        )
        .route("/v1/creds/{name}", get(issue_creds).post(issue_creds))
        .route("/v1/leases/{lease_id}", get(read_lease))
        .route("/v1/leases/{lease_id}/revoke", post(revoke_lease))
        .route("/v1/help", get(help))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(response: Response) -> Json<Value> {
    let data = match response {
        Response::Config(view) => json!(view),
        Response::Role(view) => json!(view),
        Response::RoleList(keys) => json!({ "keys": keys }),
        Response::Credential(credential) => json!(credential.public),
        Response::Deleted => Value::Null,
    };
    Json(json!({ "data": data }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn read_config(State(state): Shared) -> Result<Json<Value>, ServerError> {
    let response = state.run(Operation::Read, BackendPath::Config, Value::Null).await?;
    Ok(render(response))
}

async fn write_config(
    State(state): Shared,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    Ok(render(state.write(BackendPath::Config, body).await?))
}

async fn delete_config(State(state): Shared) -> Result<StatusCode, ServerError> {
    state
        .run(Operation::Delete, BackendPath::Config, Value::Null)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_roles(State(state): Shared) -> Result<Json<Value>, ServerError> {
    let response = state
        .run(Operation::List, BackendPath::RoleList, Value::Null)
        .await?;
    Ok(render(response))
}

async fn read_role(
    State(state): Shared,
    Path(name): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let response = state
        .run(Operation::Read, BackendPath::Role(name), Value::Null)
        .await?;
    Ok(render(response))
}

async fn write_role(
    State(state): Shared,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    Ok(render(state.write(BackendPath::Role(name), body).await?))
}

async fn delete_role(
    State(state): Shared,
    Path(name): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .run(Operation::Delete, BackendPath::Role(name), Value::Null)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET|POST /v1/creds/{name}`: issue a credential and open a lease for it.
///
/// Only the public half is returned; the internal half stays in the lease
/// table for revocation.
async fn issue_creds(
    State(state): Shared,
    Path(name): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let cancel = state.shutdown.child_token();
    let credential = state.backend.issue(&state.storage, &name, &cancel).await?;
    let lease = state
        .leases
        .register(&name, &credential, &state.config.lease_policy)
        .await;

    info!(role = %name, lease_id = %lease.lease_id, ttl = lease.lease_duration, "lease opened");
    Ok(Json(json!({ "lease": lease, "data": credential.public })))
}

async fn read_lease(
    State(state): Shared,
    Path(lease_id): Path<Uuid>,
) -> Result<Json<LeaseInfo>, ServerError> {
    state
        .leases
        .get(&lease_id)
        .await
        .map(|record| Json(record.info(lease_id)))
        .ok_or(ServerError::LeaseNotFound(lease_id))
}

/// `POST /v1/leases/{lease_id}/revoke`: sign the token out, then forget
/// the lease. A failed sign-out keeps the lease so it can be retried.
async fn revoke_lease(
    State(state): Shared,
    Path(lease_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let record = state
        .leases
        .get(&lease_id)
        .await
        .ok_or(ServerError::LeaseNotFound(lease_id))?;

    let cancel = state.shutdown.child_token();
    state
        .backend
        .revoke(&state.storage, &record.internal, &cancel)
        .await?;
    state.leases.remove(&lease_id).await;

    info!(role = %record.role, lease_id = %lease_id, "lease revoked");
    Ok(StatusCode::NO_CONTENT)
}

async fn help(State(state): Shared) -> Json<Value> {
    let paths: Vec<Value> = [
        BackendPath::Config,
        BackendPath::RoleList,
        BackendPath::Role("{name}".into()),
        BackendPath::Creds("{name}".into()),
    ]
    .iter()
    .map(|path| {
        let (synopsis, description) = path.help();
        json!({ "pattern": path.to_string(), "synopsis": synopsis, "description": description })
    })
    .collect();

    Json(json!({ "data": { "help": state.backend.help(), "paths": paths } }))
}
