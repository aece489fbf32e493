// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Default route table: forward `/api/*` to the backend.
//!
//! Requests are passed through unchanged apart from hop-by-hop headers.
//! Cookies travel in both directions so the backend session works across
//! origins, and redirects (notably from `/api/logout`) are returned to the
//! caller instead of being followed.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;

/// Route table that relays every `/api` request to `BACKEND_URL`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/{*path}", any(forward))
}

async fn forward(State(state): State<Arc<AppState>>, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", state.config.backend_url, path_and_query);

    let body = axum::body::to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|_| AppError::PayloadTooLarge(state.config.max_body_bytes))?;

    tracing::debug!(method = %parts.method, target = %target, "Relaying request");

    let upstream = state
        .http
        .request(parts.method.clone(), &target)
        .headers(forwardable(&parts.headers))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AppError::Upstream(format!("{target} timed out"))
            } else if e.is_connect() {
                AppError::Upstream(format!("failed to connect to {target}: {e}"))
            } else {
                AppError::Upstream(format!("{target}: {e}"))
            }
        })?;

    let status = upstream.status();
    tracing::debug!(status = %status, target = %target, "Upstream responded");

    let mut response = Response::builder().status(status);
    if let Some(headers) = response.headers_mut() {
        headers.extend(returnable(upstream.headers()));
    }

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(format!("failed to read response from {target}: {e}")))?;

    response
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build response: {e}")))
}

/// Copy every header that may cross a proxy. Repeated headers such as
/// `Set-Cookie` keep all their values.
fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop_header(name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Response headers for the caller. CORS headers from the backend are
/// dropped; only the relay's own CORS layer decides those.
fn returnable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop_header(name.as_str()) && !is_cors_header(name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn is_cors_header(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("access-control-")
}

/// Hop-by-hop headers (RFC 9110 section 7.6.1) plus the ones the HTTP
/// client recomputes.
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "host"
            | "content-length"
    )
}
