//! Password hashing and verification
//!
//! Passwords are stored as Argon2id PHC strings. Each hash carries its own
//! random salt, so hashing the same password twice yields different strings.

use std::sync::OnceLock;
use std::time::Duration;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::error::CredentialError;

/// Argon2 memory cost in KiB
pub const PASSWORD_MEMORY_KIB: u32 = 19_456;

/// Argon2 iteration count
pub const PASSWORD_ITERATIONS: u32 = 2;

/// Argon2 lanes
pub const PASSWORD_PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(
        PASSWORD_MEMORY_KIB,
        PASSWORD_ITERATIONS,
        PASSWORD_PARALLELISM,
        None,
    )
    .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password using Argon2id
///
/// # Errors
///
/// Returns `CredentialError::Hashing` if the hasher fails internally. Never
/// returns an empty hash.
///
/// # Example
///
/// ```
/// use procurement_api::auth::password::hash_password;
///
/// let hash = hash_password("hunter22").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(plaintext: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Stored hash to verify against when no account matches a login
///
/// Uses the same Argon2id parameters as [`hash_password`], so verifying
/// against it costs the same as verifying a real password. No password
/// matches it.
pub fn placeholder_hash() -> &'static str {
    static PLACEHOLDER: OnceLock<String> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        format!(
            "$argon2id$v=19$m={},t={},p={}$kyoakBqSjxxtuMumf17Fqw$aIYEIPUbgvQcgFciZPoLvRHmqrG1BDe/2JUXQ8B+U0U",
            PASSWORD_MEMORY_KIB, PASSWORD_ITERATIONS, PASSWORD_PARALLELISM
        )
    })
}

/// Verify a password against a stored hash
///
/// Returns `Ok(false)` when the password does not match. An error is
/// returned only if the stored hash cannot be parsed.
///
/// # Example
///
/// ```
/// use procurement_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("hunter22").unwrap();
/// assert!(verify_password(&hash, "hunter22").unwrap());
/// assert!(!verify_password(&hash, "hunter23").unwrap());
/// ```
pub fn verify_password(hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| CredentialError::Verification(e.to_string()))?;

    // Parameters come from the PHC string, not from the constants above.
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Verification(e.to_string())),
    }
}

/// Deadline-bounded password hashing and verification
///
/// Argon2 is CPU- and memory-heavy, so the work runs on the blocking pool.
/// The caller waits at most `timeout`; dropping the returned future stops the
/// wait as well.
#[derive(Debug, Clone, Copy)]
pub struct CredentialVerifier {
    timeout: Duration,
}

impl CredentialVerifier {
    /// Create a verifier with the given per-operation deadline
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-operation deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Hash `plaintext` on the blocking pool
    pub async fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let plaintext = plaintext.to_string();
        self.run(move || hash_password(&plaintext)).await
    }

    /// Verify `plaintext` against `hash` on the blocking pool
    pub async fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
        let hash = hash.to_string();
        let plaintext = plaintext.to_string();
        self.run(move || verify_password(&hash, &plaintext)).await
    }

    async fn run<T, F>(&self, work: F) -> Result<T, CredentialError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CredentialError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(CredentialError::Hashing(join_err.to_string())),
            Err(_) => Err(CredentialError::Timeout),
        }
    }
}
