//! Authentication and authorization for procurement-api
//!
//! This module provides:
//! - Password hashing and verification under a deadline
//! - Signed bearer token issuing and validation
//! - The per-request caller identity
//! - Ownership checks for vendor and product creation

pub mod identity;
pub mod manager;
pub mod ownership;
pub mod password;
pub mod token;

pub use identity::Identity;
pub use manager::{AuthManager, BEARER_PREFIX, MAX_TOKEN_LENGTH};
pub use ownership::OwnershipGuard;
pub use password::CredentialVerifier;
pub use token::{Claims, IssuedToken, TokenService, MIN_SECRET_LENGTH};
