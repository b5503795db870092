use serde::{Deserialize, Serialize};

/// Error kinds per `spec.md` §7. `DailyCapReached` and `PartialSuccess` are
/// intentionally absent — the spec signals those through the review
/// result payload (`daily_limit_hit`, HTTP 206), not as thrown errors.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Authorization,
    Validation,
    NotFound,
    ConflictState,
    WindowViolation,
    AlreadyScored,
    Transient,
    Internal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn authorization(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Authorization,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: message.into(),
            details: None,
        }
    }

    pub fn conflict_state(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ConflictState,
            message: message.into(),
            details: None,
        }
    }

    pub fn window_violation(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::WindowViolation,
            message: message.into(),
            details: None,
        }
    }

    pub fn already_scored(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::AlreadyScored,
            message: message.into(),
            details: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Transient,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_sqlx(err: sqlx::Error, message: impl Into<String>) -> Self {
        let mut base: ApiError = err.into();
        base.message = message.into();
        base
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                    ApiError::conflict_state(db_err.message().to_string())
                } else {
                    ApiError::internal(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ApiError::transient("Database temporarily unavailable")
            }
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ApiError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ApiError::internal(err.to_string())
    }
}
