//! Bearer token issuance and validation
//!
//! Tokens are compact JWS strings signed with HMAC-SHA256:
//! `base64url(header).base64url(claims).base64url(signature)`.
//! Only `HS256` is accepted; any other `alg` value, including `none`, is
//! rejected before the signature is looked at.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use uuid::Uuid;

use super::identity::Identity;
use crate::config::ConfigError;
use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default token lifetime in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;

/// The only accepted signing algorithm
pub const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// User role
    pub role: String,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
}

impl Claims {
    /// Pull typed claims out of a decoded JSON object
    fn from_map(map: &Map<String, Value>) -> Result<Self, TokenError> {
        let sub = map
            .get("sub")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(TokenError::MissingClaim("sub"))?;

        let role = map
            .get("role")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .ok_or(TokenError::MissingClaim("role"))?
            .to_string();

        let exp = map
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(TokenError::MissingClaim("exp"))?;

        let iat = map.get("iat").and_then(Value::as_i64).unwrap_or(0);

        Ok(Self {
            sub,
            role,
            iat,
            exp,
        })
    }
}

/// A freshly minted token and its absolute expiry
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates bearer tokens with one process-wide secret
///
/// Built once at startup and shared behind an `Arc`. Holds no mutable state.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a token service
    ///
    /// # Errors
    ///
    /// Fails if the secret is shorter than [`MIN_SECRET_LENGTH`] bytes or the
    /// lifetime is not positive.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if ttl <= Duration::zero() {
            return Err(ConfigError::InvalidValue(
                "token lifetime must be positive".to_string(),
            ));
        }

        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ConfigError::InvalidValue(format!("auth.jwt_secret: {}", e)))?;

        Ok(Self { mac, ttl })
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `subject` valid until `now + ttl`
    ///
    /// The expiry is truncated to whole seconds so the returned `expires_at`
    /// is exactly the instant encoded in the token.
    pub fn issue(
        &self,
        subject: Uuid,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))?
            .timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))?;

        let claims = Claims {
            sub: subject,
            role: role.to_string(),
            iat: now.timestamp(),
            exp,
        };
        let header = TokenHeader {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| TokenError::Signing(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token: self.sign(&header_json, &claims_json),
            expires_at,
        })
    }

    /// Validate a token and project it to an [`Identity`]
    ///
    /// Checks run in order: structure, algorithm, signature, claims, expiry.
    /// Expiry is strict: a token is rejected once `now > expires_at`.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: TokenHeader = decode_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload: Value = decode_json(claims_b64)?;
        let Value::Object(map) = payload else {
            return Err(TokenError::Malformed);
        };
        let claims = Claims::from_map(&map)?;

        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::MissingClaim("exp"))?;
        if now > expires_at {
            return Err(TokenError::Expired);
        }

        Ok(Identity::new(claims.sub, claims.role))
    }

    fn sign(&self, header_json: &[u8], claims_json: &[u8]) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
