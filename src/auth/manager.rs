//! Authentication manager
//!
//! This module provides the main authentication interface for the application:
//! bearer credential checks for the middleware, login, and registration.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::identity::Identity;
use super::password::{placeholder_hash, CredentialVerifier};
use super::token::{IssuedToken, TokenService};
use crate::api::{bounded_text, validate_email, validate_password, MAX_USER_NAME_LENGTH, MIN_USER_NAME_LENGTH};
use crate::database::Database;
use crate::error::{AppError, AuthError, CredentialError, DbError, TokenError};
use crate::models::{CreateUserRequest, LoginRequest, User};
use crate::otel::AuthMetrics;

/// Authorization scheme prefix, matched exactly
pub const BEARER_PREFIX: &str = "Bearer ";

/// Tokens longer than this are rejected before any decoding
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Authentication manager
///
/// One instance is built at startup and shared by every request.
pub struct AuthManager<D: Database> {
    db: Arc<D>,
    tokens: Arc<TokenService>,
    credentials: CredentialVerifier,
    metrics: Arc<AuthMetrics>,
}

impl<D: Database> AuthManager<D> {
    /// Create a new authentication manager
    pub fn new(
        db: Arc<D>,
        tokens: Arc<TokenService>,
        credentials: CredentialVerifier,
        metrics: Arc<AuthMetrics>,
    ) -> Self {
        Self {
            db,
            tokens,
            credentials,
            metrics,
        }
    }

    /// Shared token service
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Check an `Authorization` header value
    ///
    /// Requires the exact `Bearer ` prefix, then validates the token at `now`.
    /// Performs no storage access. The failure reason is logged and counted
    /// but callers must not return it to the client.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let result = authorization
            .ok_or(AuthError::MissingAuth)
            .and_then(|value| {
                value
                    .strip_prefix(BEARER_PREFIX)
                    .ok_or(AuthError::InvalidScheme)
            })
            .and_then(|token| {
                if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
                    return Err(TokenError::Malformed.into());
                }
                self.tokens.validate(token, now).map_err(AuthError::from)
            });

        if let Err(err) = &result {
            let reason = rejection_reason(err);
            debug!(reason, "Bearer authentication rejected");
            self.metrics.record_auth_rejection(reason);
        }

        result
    }

    /// Verify email and password, then issue a token
    ///
    /// Unknown email and wrong password produce the same error, and both run
    /// one Argon2 verification.
    pub async fn login(
        &self,
        req: &LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<(User, IssuedToken), AppError> {
        let email = validate_email(&req.email)?;
        if req.password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }

        let Some(user) = self.db.get_user_by_email(&email).await? else {
            // Same Argon2 work as a wrong password
            self.verify_password(placeholder_hash(), &req.password).await?;
            debug!("Login failed: unknown email");
            self.metrics.record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.verify_password(&user.password_hash, &req.password).await? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            self.metrics.record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials.into());
        }

        let issued = self.tokens.issue(user.id, &user.role, now)?;
        self.metrics.record_login("success");
        info!(user_id = %user.id, expires_at = %issued.expires_at, "User logged in");

        Ok((user, issued))
    }

    /// Create a new account
    ///
    /// Duplicate emails are a conflict, whether caught by the lookup or by
    /// the storage constraint.
    pub async fn register(&self, req: &CreateUserRequest) -> Result<User, AppError> {
        let user_name = bounded_text(
            "user_name",
            &req.user_name,
            MIN_USER_NAME_LENGTH,
            MAX_USER_NAME_LENGTH,
        )?;
        let email = validate_email(&req.email)?;
        validate_password("password", &req.password)?;

        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = self.hash_password(&req.password).await?;
        let user = User::new(user_name, email, password_hash);

        match self.db.create_user(&user).await {
            Ok(()) => {}
            Err(DbError::ConstraintViolation(_)) => return Err(email_taken()),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Hash a password within the configured deadline
    pub async fn hash_password(&self, plaintext: &str) -> Result<String, CredentialError> {
        let started = Instant::now();
        let result = self.credentials.hash(plaintext).await;
        self.metrics
            .record_credential_duration("hash", started.elapsed().as_secs_f64());
        result
    }

    /// Verify a password within the configured deadline
    pub async fn verify_password(
        &self,
        hash: &str,
        plaintext: &str,
    ) -> Result<bool, CredentialError> {
        let started = Instant::now();
        let result = self.credentials.verify(hash, plaintext).await;
        self.metrics
            .record_credential_duration("verify", started.elapsed().as_secs_f64());
        result
    }
}

fn email_taken() -> AppError {
    AppError::Conflict("email already registered".to_string())
}

fn rejection_reason(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingAuth => "missing_header",
        AuthError::InvalidScheme => "invalid_scheme",
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::InvalidToken(TokenError::Malformed) => "malformed",
        AuthError::InvalidToken(TokenError::UnsupportedAlgorithm(_)) => "unsupported_algorithm",
        AuthError::InvalidToken(TokenError::InvalidSignature) => "invalid_signature",
        AuthError::InvalidToken(TokenError::MissingClaim(_)) => "missing_claim",
        AuthError::InvalidToken(TokenError::Expired) => "expired",
        AuthError::InvalidToken(TokenError::Signing(_)) => "signing",
    }
}
