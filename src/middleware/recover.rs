// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catch-all for panics raised while handling a request.

use crate::error::AppError;
use axum::response::{IntoResponse, Response};
use std::any::Any;

/// Turn a handler panic into a logged, generic 500 so one bad request
/// cannot take the process down.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(anyhow::anyhow!("handler panicked: {message}")).into_response()
}
