//! API error type.
//!
//! Every handler returns `Result<_, ApiError>`; the HTTP layer renders the
//! error as `{statusCode, message, error}`.

use crate::executor::{ConstraintViolation, DbError};
use crate::pool::PoolError;
use crate::transaction::TransactionError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level validation failures, reported as a list.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Forbidden resource".to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal() -> Self {
        ApiError::Internal("Internal server error".to_string())
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::Internal(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// `{statusCode, message, error}`; validation errors carry a message array.
    pub fn body(&self) -> Value {
        let message = match self {
            ApiError::Validation(messages) => json!(messages),
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::ServiceUnavailable(m)
            | ApiError::BadGateway(m)
            | ApiError::Internal(m) => json!(m),
        };
        json!({
            "statusCode": self.status(),
            "message": message,
            "error": crate::http::reason_phrase(self.status()),
        })
    }
}

/// `<table>_<field>_key` -> `<field>`
fn unique_field(table: Option<&str>, constraint: &str) -> String {
    let without_suffix = constraint.strip_suffix("_key").unwrap_or(constraint);
    let field = table
        .and_then(|t| without_suffix.strip_prefix(t))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(without_suffix);
    field.to_string()
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err.constraint_violation() {
            Some(ConstraintViolation::Unique { table, constraint }) => {
                let field = constraint
                    .as_deref()
                    .map(|c| unique_field(table.as_deref(), c))
                    .unwrap_or_else(|| "value".to_string());
                ApiError::BadRequest(format!("{field} already exists"))
            }
            Some(ConstraintViolation::ForeignKey { table }) => ApiError::BadRequest(format!(
                "{} is still referenced",
                table.as_deref().unwrap_or("record")
            )),
            Some(ConstraintViolation::Check { constraint }) => ApiError::BadRequest(format!(
                "Check constraint failed: {}",
                constraint.as_deref().unwrap_or("unknown")
            )),
            None => {
                log::error!("database error: {err}");
                ApiError::internal()
            }
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        ApiError::from(DbError::from(err))
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        log::warn!("no database connection available: {err}");
        ApiError::ServiceUnavailable("Service temporarily unavailable".to_string())
    }
}
