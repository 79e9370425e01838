// HTTP API error types and the shared response envelope.
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Machine-readable error codes surfaced in the `code` field of the envelope.
pub mod codes {
    pub const MISSING_AUTH: &str = "MISSING_AUTH";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const DB_ERROR: &str = "DB_ERROR";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const SERVER_MISCONFIGURED: &str = "SERVER_MISCONFIGURED";
    pub const DB_UNREACHABLE: &str = "DB_UNREACHABLE";
    pub const DB_SCHEMA_MISSING: &str = "DB_SCHEMA_MISSING";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// API error with appropriate status codes and client-friendly messages.
///
/// Every user-visible failure renders as `{error, statusCode, code}`.
/// Internal detail (raw store errors, stack context) is logged, never leaked.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized, with a code distinguishing the rejection gate
    Unauthorized { message: String, code: &'static str },

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // Duplicate slug/email. Mapped to 400 by long-standing client convention.
    Conflict(String),

    // 500 Internal Server Error
    Internal { message: String, code: &'static str },

    // 503 Service Unavailable
    ServiceUnavailable { message: String, code: &'static str },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg,
            ApiError::Unauthorized { message, .. }
            | ApiError::Internal { message, .. }
            | ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized { code, .. } => code,
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal { code, .. } => code,
            ApiError::ServiceUnavailable { code, .. } => code,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": self.message(),
            "statusCode": self.status_code().as_u16(),
            "code": self.error_code(),
        })
    }
}

// Static constructors, mirroring handler call sites.
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>, code: &'static str) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            code,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            code: codes::INTERNAL_ERROR,
        }
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            code: codes::SERVER_MISCONFIGURED,
        }
    }

    pub fn service_unavailable(message: impl Into<String>, code: &'static str) -> Self {
        ApiError::ServiceUnavailable {
            message: message.into(),
            code,
        }
    }
}

/// Classify a Postgres error message into a client-facing error.
///
/// Constraint violations are the caller's fault and map to 400 with the
/// store's message; a missing relation means migrations have not run.
/// Returns `None` for anything unrecognized.
pub fn classify_db_message(msg: &str) -> Option<ApiError> {
    if msg.contains("duplicate key")
        || msg.contains("violates not-null constraint")
        || msg.contains("violates check constraint")
        || msg.contains("violates foreign key constraint")
    {
        return Some(ApiError::bad_request(msg.to_string()));
    }
    if msg.contains("does not exist") && msg.contains("relation") {
        return Some(ApiError::Internal {
            message: "Database schema missing (run migrations)".to_string(),
            code: codes::DB_SCHEMA_MISSING,
        });
    }
    None
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Not found"),
            sqlx::Error::Database(db_err) => {
                if let Some(classified) = classify_db_message(db_err.message()) {
                    return classified;
                }
                tracing::error!("database error: {}", db_err);
                ApiError::internal("An unexpected database error occurred")
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => {
                tracing::error!("database unreachable: {}", err);
                ApiError::service_unavailable("Database unreachable", codes::DB_UNREACHABLE)
            }
            _ => {
                tracing::error!("store error: {}", err);
                ApiError::internal("An unexpected error occurred")
            }
        }
    }
}

impl From<crate::database::patch::PatchError> for ApiError {
    fn from(err: crate::database::patch::PatchError) -> Self {
        use crate::database::patch::PatchError;
        match err {
            PatchError::NoFieldsToUpdate => ApiError::bad_request("No fields to update"),
            PatchError::ColumnNotAllowed(column) => {
                tracing::error!("patch referenced disallowed column: {}", column);
                ApiError::internal("An unexpected error occurred")
            }
            PatchError::Db(err) => err.into(),
        }
    }
}

impl From<crate::database::DatabaseError> for ApiError {
    fn from(err: crate::database::DatabaseError) -> Self {
        use crate::database::DatabaseError;
        match err {
            DatabaseError::ConfigMissing(name) => {
                ApiError::misconfigured(format!("Missing configuration: {}", name))
            }
            DatabaseError::Sqlx(err) => err.into(),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("password hashing error: {}", err);
        ApiError::internal("Password processing failed")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
