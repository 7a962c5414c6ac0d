use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

/// SQLSTATE raised by Postgres on a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Issuance error: {0}")]
    IssuanceError(#[from] IssuanceError),

    #[error("Notifier error: {0}")]
    NotifierError(#[from] NotifierError),

    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden")]
    Forbidden,
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreError(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StoreError(StoreError::Migration(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::SessionError(_) => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotifierError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    Migration(String),

    /// Another token already uses this secret. Callers regenerate and retry.
    #[error("Duplicate secret")]
    DuplicateSecret,

    /// The secret is unknown or its token was already redeemed. The two cases
    /// are deliberately not distinguished.
    #[error("Token already redeemed or not found")]
    AlreadyRedeemedOrNotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().is_some_and(|code| code.as_ref() == UNIQUE_VIOLATION) =>
            {
                StoreError::DuplicateSecret
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionError(err.to_string())
            }
            _ => StoreError::QueryError(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("No unique secret for user {user_id} after {attempts} attempts")]
    SecretsExhausted { user_id: i64, attempts: u32 },

    #[error("Secret generation failed: {0}")]
    RandomFailure(String),

    #[error("Invalid redemption link: {0}")]
    InvalidLink(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A campaign stopped part way; `issued` tokens were already created and
    /// delivered (or attempted) before the failure.
    #[error("Campaign aborted after {issued} tokens: {cause}")]
    Aborted {
        issued: u64,
        #[source]
        cause: Box<IssuanceError>,
    },
}

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Delivery request failed: {0}")]
    RequestFailed(String),

    #[error("Delivery rejected with status {0}")]
    Rejected(u16),

    #[error("Notifier misconfigured: {0}")]
    Misconfigured(String),
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        NotifierError::RequestFailed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Missing session")]
    Missing,

    #[error("Invalid session: {0}")]
    Invalid(String),

    #[error("Session signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SessionError::Invalid(err.to_string())
    }
}
