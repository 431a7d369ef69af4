use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

/// Shared-secret authentication middleware for /hooks routes
///
/// Webhook callers authenticate with a bearer-style shared secret. Missing
/// or mismatched secrets are rejected with 401 before any state is touched.
pub async fn shared_secret_middleware(
    secret: Arc<String>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match bearer_token(&request) {
        Some(token) if token == secret.as_str() => next.run(request).await,
        _ => {
            debug!("rejected hook request: missing or invalid shared secret");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response()
        }
    }
}

/// Extract the bearer token from the request
fn bearer_token(request: &axum::http::Request<axum::body::Body>) -> Option<&str> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Handle both "Bearer <token>" and raw token
    Some(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str))
}
