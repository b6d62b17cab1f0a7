//! Host-header allowlist enforcement.
//!
//! When `ALLOWED_HOSTS` is configured, requests whose `Host` header is not
//! on the list are rejected with 400 before any routing happens.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Reject requests with a disallowed `Host` header.
pub async fn enforce_allowed_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if state.config().host_allowed(host) {
        next.run(request).await
    } else {
        tracing::warn!(host, "request rejected by host allowlist");
        (StatusCode::BAD_REQUEST, "Invalid Host header").into_response()
    }
}
