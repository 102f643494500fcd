//! Error types for the development host.
//!
//! [`ServerError`] wraps engine failures and host-level lookups and
//! implements [`axum::response::IntoResponse`] so handlers can return
//! `Result<…, ServerError>` directly.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokenlease_engine::EngineError;
use uuid::Uuid;

/// Errors a request can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The engine rejected or failed the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No live lease has this id.
    #[error("lease {0} not found")]
    LeaseNotFound(Uuid),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::Validation(_) | EngineError::InvalidArgument(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
                EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
                EngineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                EngineError::UnsupportedOperation { .. } => StatusCode::METHOD_NOT_ALLOWED,
                EngineError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::LeaseNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "errors": [message] }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use tokenlease_engine::StorageError;
    use tokenlease_models::ModelError;

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                ServerError::from(EngineError::Validation(ModelError::MissingField {
                    field: "url",
                    context: "configuration",
                })),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::InvalidArgument("x".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (EngineError::NotFound("role r".into()).into(), StatusCode::NOT_FOUND),
            (
                EngineError::Configuration("not configured".into()).into(),
                StatusCode::PRECONDITION_FAILED,
            ),
            (EngineError::Upstream("boom".into()).into(), StatusCode::BAD_GATEWAY),
            (EngineError::Cancelled.into(), StatusCode::REQUEST_TIMEOUT),
            (
                EngineError::storage("read", "config", StorageError::new("io")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::LeaseNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }
}
