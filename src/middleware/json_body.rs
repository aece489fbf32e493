// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON request body parsing for the route table.

use crate::error::AppError;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;

/// Parsed JSON body, available to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

/// Parse JSON request bodies before they reach the route table.
///
/// Non-JSON requests pass through untouched. JSON bodies are buffered up to
/// `max_body_bytes`, rejected with 400 if malformed, and re-attached to the
/// request as raw bytes so handlers can still forward them.
pub async fn parse_json_body(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_json(request.headers()) {
        return Ok(next.run(request).await);
    }

    let limit = state.config.max_body_bytes;
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge(limit));
    }

    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| AppError::PayloadTooLarge(limit))?;

    if !bytes.is_empty() {
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {e}")))?;
        parts.extensions.insert(JsonBody(value));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// `application/json` or any `+json` media type.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
