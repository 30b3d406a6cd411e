use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TrainerError {
    #[error("Database unreachable: {0}")]
    Connection(#[source] SqlxError),

    #[error("Schema creation failed: {0}")]
    Schema(#[source] SqlxError),

    #[error("Integrity conflict: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl TrainerError {
    /// True when a statement lost a race against a concurrent insert of the same key.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            TrainerError::DatabaseError(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl IntoResponse for TrainerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            TrainerError::Unauthenticated => return Redirect::to("/login").into_response(),
            TrainerError::Connection(_)
            | TrainerError::Schema(_)
            | TrainerError::Integrity(_)
            | TrainerError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
            TrainerError::PasswordHash(_) | TrainerError::Token(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "AUTH_BACKEND_ERROR".to_string(),
                    message: "Unable to process credentials.".to_string(),
                },
            ),
            TrainerError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "CONFIG_ERROR".to_string(),
                    message: "Server is misconfigured.".to_string(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
