//! Error types for the molstore server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use molstore_query::QueryError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bad caller input, detected before any statement runs.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A statement failed at the record-store boundary.
    #[error("{operation} on {table}{} failed: {message}", target_suffix(.target))]
    Query {
        operation: &'static str,
        table: &'static str,
        target: Option<String>,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn target_suffix(target: &Option<String>) -> String {
    target
        .as_deref()
        .map(|t| format!(" (id {t})"))
        .unwrap_or_default()
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Query { .. } => {
                tracing::error!(error = %self, "Query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Error::Database(_) | Error::Internal(_) | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
