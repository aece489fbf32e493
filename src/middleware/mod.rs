// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (JSON body parsing, panic recovery).

pub mod json_body;
pub mod recover;

pub use json_body::{parse_json_body, JsonBody};
pub use recover::handle_panic;
