//! Verified caller identity for a single request
//!
//! The auth middleware attaches an [`Identity`] to the request extensions
//! after the bearer token validates. Handlers read it back with
//! [`from_extensions`] or by taking `Identity` as an extractor argument.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Extensions;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, ContextError};

/// Trusted `{user_id, role}` projection of validated token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: String,
}

impl Identity {
    pub fn new(user_id: Uuid, role: String) -> Self {
        Self { user_id, role }
    }
}

/// Attach a verified identity to the request
pub fn attach(extensions: &mut Extensions, identity: Identity) {
    extensions.insert(identity);
}

/// Read the verified identity back out of the request
///
/// Returns `ContextError::MissingIdentity` when the request never passed
/// through the auth middleware.
pub fn from_extensions(extensions: &Extensions) -> Result<Identity, ContextError> {
    extensions
        .get::<Identity>()
        .cloned()
        .ok_or(ContextError::MissingIdentity)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_extensions(&parts.extensions).map_err(|e| {
            tracing::error!(
                path = %parts.uri.path(),
                "Handler reached without an authenticated identity"
            );
            AppError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    // Test 1: attach then read back
    #[test]
    fn test_attach_and_read() {
        let mut extensions = Extensions::new();
        let identity = Identity::new(Uuid::new_v4(), "user".to_string());

        attach(&mut extensions, identity.clone());

        assert_eq!(from_extensions(&extensions), Ok(identity));
    }

    // Test 2: empty context is an error, not a panic
    #[test]
    fn test_missing_identity() {
        let extensions = Extensions::new();
        assert_eq!(
            from_extensions(&extensions),
            Err(ContextError::MissingIdentity)
        );
    }

    // Test 3: unrelated extension values do not satisfy the lookup
    #[test]
    fn test_wrong_shape_is_missing() {
        let mut extensions = Extensions::new();
        extensions.insert(Uuid::new_v4());
        extensions.insert("user".to_string());

        assert_eq!(
            from_extensions(&extensions),
            Err(ContextError::MissingIdentity)
        );
    }

    // Test 4: extractor rejects with 401 when identity is absent
    #[tokio::test]
    async fn test_extractor_rejects_without_identity() {
        let (mut parts, _) = Request::builder()
            .uri("/api/v1/vendor")
            .body(())
            .unwrap()
            .into_parts();

        let result = Identity::from_request_parts(&mut parts, &()).await;

        match result {
            Err(err) => assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED),
            Ok(_) => panic!("Expected rejection"),
        }
    }

    // Test 5: extractor returns the attached identity
    #[tokio::test]
    async fn test_extractor_returns_identity() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let identity = Identity::new(Uuid::new_v4(), "admin".to_string());
        attach(&mut parts.extensions, identity.clone());

        let extracted = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted, identity);
    }
}
