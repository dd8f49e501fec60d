//! API error type and the `{status, message}` error envelope
//!
//! Store failures keep their `sqlx::Error` as the source so the full
//! detail reaches the server log, while the client only sees the
//! operation that failed. Statement text and bound values are never part
//! of a response.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result alias for handlers and services
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields (400). Raised before any store access.
    #[error("{0}")]
    Input(String),

    /// Referenced entity does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// A code did not match any catalog row under strict code resolution (400)
    #[error("Unknown {kind} code '{code}'")]
    UnknownCode { kind: &'static str, code: String },

    /// Pool or store unreachable (503)
    #[error("Database unavailable while {operation}")]
    Connection {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A read statement failed (500)
    #[error("Query failed while {context}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A code lookup statement itself failed, as opposed to finding no match (500)
    #[error("Lookup failed while {context}")]
    Lookup {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// An insert or update failed (500)
    #[error("Write failed while {step}")]
    Mutation {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The transaction could not be committed (500)
    #[error("Commit failed")]
    Commit(#[source] sqlx::Error),

    /// Invariant broken inside the service (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pool exhaustion and transport failures mean the store is unreachable,
/// not that the statement was wrong.
fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

impl ApiError {
    /// Map a failed read statement, logging it with its context
    pub fn query(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            if is_connection_failure(&source) {
                return Self::connection(context)(source);
            }
            error!(context, error = %source, "Query failed");
            Self::Query { context, source }
        }
    }

    /// Map a failed code lookup statement
    pub fn lookup(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            if is_connection_failure(&source) {
                return Self::connection(context)(source);
            }
            error!(context, error = %source, "Lookup query failed");
            Self::Lookup { context, source }
        }
    }

    /// Map a failed insert/update statement
    pub fn mutation(step: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            if is_connection_failure(&source) {
                return Self::connection(step)(source);
            }
            error!(step, error = %source, "Write failed");
            Self::Mutation { step, source }
        }
    }

    /// Map a failure to reach the store at all
    pub fn connection(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            error!(operation, error = %source, "Could not reach database");
            Self::Connection { operation, source }
        }
    }

    /// HTTP status for this error class
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) | Self::UnknownCode { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query { .. }
            | Self::Lookup { .. }
            | Self::Mutation { .. }
            | Self::Commit(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Input(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Input(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "status": status.as_u16(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
