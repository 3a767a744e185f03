use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection could not be checked out of the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The pool could not be built.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A column was missing or had an unexpected type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A uniqueness constraint rejected a write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// A session could not be encoded or decoded.
    #[error("Session error: {0}")]
    Session(String),

    /// The request body could not be decoded.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Writes the error to the server log. The client never sees these details.
    fn log(&self) {
        match self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Pool(e) => tracing::error!("Pool error: {}", e),
            AppError::CreatePool(e) => tracing::error!("Pool creation error: {}", e),
            AppError::Redis(e) => tracing::error!("Redis error: {}", e),
            AppError::MissingData(column) => tracing::error!("Missing column: {}", column),
            AppError::Conflict(msg) => tracing::warn!("Conflict: {}", msg),
            AppError::PasswordHash(msg) => tracing::error!("Password hashing error: {}", msg),
            AppError::Session(msg) => tracing::error!("Session error: {}", msg),
            AppError::MalformedRequest(msg) => tracing::debug!("Malformed request: {}", msg),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        match self {
            AppError::MalformedRequest(_) => {
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        }
    }
}

/// Renders any failure as a generic `400 Bad Request`.
///
/// The form and path handlers answer unexpected failures this way; the
/// listing page keeps the plain `AppError` response (500).
#[derive(Debug)]
pub struct BadRequest(pub AppError);

impl From<AppError> for BadRequest {
    fn from(err: AppError) -> Self {
        BadRequest(err)
    }
}

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        self.0.log();
        (StatusCode::BAD_REQUEST, "Bad Request").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failures_hide_details() {
        let response = AppError::Internal("secret detail".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_requests_are_client_errors() {
        let response = AppError::MalformedRequest("bad form".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_request_wrapper_overrides_status() {
        let response = BadRequest(AppError::Session("corrupt".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
