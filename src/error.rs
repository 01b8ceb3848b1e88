//! Application error types for procurement-api
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ApiResponse;

/// Request-level authentication errors raised by the gate and by login
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingAuth,

    /// Authorization header present but not a bearer credential
    #[error("Unsupported authorization scheme")]
    InvalidScheme,

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Email or password did not match
    #[error("Invalid email or password")]
    InvalidCredentials,
}

/// Bearer token validation and signing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    /// Token cannot be split into header, claims and signature
    #[error("Malformed token")]
    Malformed,

    /// Header names an algorithm other than HS256
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature does not verify under the configured secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// A required claim is absent or of the wrong type
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),

    /// Token is past its expiry
    #[error("Token expired")]
    Expired,

    /// Signing failed for reasons unrelated to caller input
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CredentialError {
    /// Hash generation failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored hash is not a valid PHC string
    #[error("Stored password hash is invalid: {0}")]
    Verification(String),

    /// Hashing did not finish within the deadline
    #[error("Credential operation timed out")]
    Timeout,
}

/// Request-scoped identity lookup errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// No verified identity attached to the request
    #[error("No authenticated identity in request context")]
    MissingIdentity,
}

/// Ownership authorization errors
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// Token subject has no user record
    #[error("User not found")]
    UnknownUser,

    /// Caller already owns a vendor
    #[error("User already has a vendor")]
    VendorAlreadyExists,

    /// Caller owns no vendor
    #[error("Vendor not found for this user")]
    NoVendor,

    /// Target vendor is not the caller's
    #[error("You can only create products for your own vendor")]
    ForeignVendor,

    /// Storage lookup failed
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection closed or background thread failure
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(message.unwrap_or_else(|| code.to_string()))
            }
            other => DbError::Sqlite(other),
        }
    }
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => e.into(),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Application-level error type
///
/// Every handler returns this. Each variant maps to exactly one HTTP status,
/// and `Internal` detail never reaches the client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    /// Request body or parameters failed validation
    #[error("{0}")]
    Validation(String),

    /// Missing or rejected credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not entitled to the resource
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate ownership or unique key
    #[error("{0}")]
    Conflict(String),

    /// Failure unrelated to caller input
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(error = %detail, "Request failed with internal error");
        }
        let status = self.status_code();
        (status, Json(ApiResponse::error(self.public_message()))).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::NotFound("Record not found".to_string()),
            DbError::ConstraintViolation(detail) => {
                debug!(detail = %detail, "Storage constraint rejected write");
                AppError::Conflict(CONFLICT_MESSAGE.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<OwnershipError> for AppError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::UnknownUser => AppError::NotFound(err.to_string()),
            OwnershipError::VendorAlreadyExists => AppError::Conflict(err.to_string()),
            OwnershipError::NoVendor => AppError::NotFound(err.to_string()),
            OwnershipError::ForeignVendor => AppError::Forbidden(err.to_string()),
            OwnershipError::Storage(db) => db.into(),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => AppError::Internal(err.to_string()),
            _ => AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            _ => AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()),
        }
    }
}

impl From<ContextError> for AppError {
    fn from(_: ContextError) -> Self {
        AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// The single message returned for every rejected bearer credential
pub const UNAUTHORIZED_MESSAGE: &str = "Missing or invalid authentication token";

/// Client message for writes rejected by a storage constraint
pub const CONFLICT_MESSAGE: &str = "Request conflicts with existing data";
