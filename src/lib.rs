// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prayer Circle: shared relay and client core for the prayer request app.
//!
//! The relay half (`routes`, `middleware`) is a CORS-aware pass-through in
//! front of the backend API. The client half (`query`, `session`, `views`)
//! holds the data-fetching cache and the view models the web and mobile
//! clients render.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routes;
pub mod session;
pub mod views;

use config::Config;
use std::time::Duration;

/// Shared relay state.
pub struct AppState {
    pub config: Config,
    /// Client used to reach the upstream backend.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the relay state, including the upstream HTTP client.
    ///
    /// Redirects are never followed so that responses such as the logout
    /// redirect reach the browser unchanged.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }
}
