use crate::ApiError;
use crate::ErrorDetail;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::serde::json::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    DuplicateUser(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(DieselError),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            // users carries unique indexes on username and email
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ServiceError::DuplicateUser("Username or email already registered".to_string())
            }
            other => ServiceError::Database(other),
        }
    }
}

impl ServiceError {
    pub fn not_found(what: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{what} {id} not found"))
    }
}

fn detail(error: &str, message: impl Into<String>) -> Json<ErrorDetail> {
    Json(ErrorDetail {
        error: error.to_string(),
        message: message.into(),
    })
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::NotFound(detail("not_found", msg)),
            ServiceError::InvalidCredentials => {
                ApiError::Unauthorized(detail("invalid_credentials", "Invalid username or password"))
            }
            ServiceError::DuplicateUser(msg) => ApiError::Conflict(detail("duplicate_user", msg)),
            ServiceError::Validation(msg) => ApiError::Validation(detail("validation_error", msg)),
            infra => {
                tracing::error!(error = %infra, "request failed on infrastructure error");
                ApiError::InternalError(detail(
                    "internal_server_error",
                    "An unexpected error occurred on the server.",
                ))
            }
        }
    }
}
