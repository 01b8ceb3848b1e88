//! HTTP middleware for procurement-api
//!
//! This module provides middleware layers for:
//! - Bearer authentication of protected routes
//! - Request/response logging
//! - OpenTelemetry tracing

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{identity, AuthManager};
use crate::database::Database;
use crate::error::{AppError, UNAUTHORIZED_MESSAGE};

/// Authentication middleware function
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Validates the bearer token against the current time
/// 3. Adds the caller's identity to the request extensions
///
/// Every failure produces the same 401 body, and the wrapped handler is not
/// invoked.
pub async fn auth_middleware<D: Database + 'static>(
    State(auth_manager): State<Arc<AuthManager<D>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = auth_manager
        .authenticate(auth_header, Utc::now())
        .map_err(|_| AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()))?;

    identity::attach(request.extensions_mut(), identity);

    Ok(next.run(request).await)
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}

/// Tracing middleware function
///
/// Creates a span covering the whole request so that handler logs and
/// exported traces share it.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    use tracing::Instrument;

    let method = request.method().clone();
    let uri = request.uri().clone();

    let span = tracing::info_span!(
        "http_request",
        http.method = %method,
        http.url = %uri.path(),
        http.status_code = tracing::field::Empty,
    );

    async move {
        let response = next.run(request).await;
        tracing::Span::current().record("http.status_code", response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}
