// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Both the relay and the query client read their settings once at startup.
//! Nothing here is reloaded while the process runs.

use axum::http::HeaderValue;
use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SERVICE_NAME: &str = "prayer-circle-api";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:8081";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024;

/// Relay configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Name reported by the health check
    pub service_name: String,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
    /// Base URL of the backend the `/api` routes are forwarded to
    pub backend_url: String,
    /// Upper bound on a single upstream request
    pub upstream_timeout_secs: u64,
    /// Largest JSON body accepted by the relay
    pub max_body_bytes: usize,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let allowed_origins = split_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );
        if allowed_origins.is_empty() {
            return Err(ConfigError::Invalid(
                "ALLOWED_ORIGINS",
                "at least one origin is required".to_string(),
            ));
        }
        if let Some(bad) = allowed_origins
            .iter()
            .find(|origin| HeaderValue::from_str(origin).is_err())
        {
            return Err(ConfigError::Invalid(
                "ALLOWED_ORIGINS",
                format!("not a valid origin: {bad}"),
            ));
        }

        let backend_url = env::var("BACKEND_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "BACKEND_URL",
                format!("expected an http(s) URL, got {backend_url}"),
            ));
        }

        Ok(Self {
            port: parse_or("PORT", DEFAULT_PORT),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
            allowed_origins,
            backend_url,
            upstream_timeout_secs: parse_or("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS),
            max_body_bytes: parse_or("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        })
    }
}

/// Query cache settings.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// How long a successful result stays fresh. `None` never goes stale.
    pub stale_time: Option<Duration>,
    /// Extra attempts after a retryable failure.
    pub retry: u32,
    /// Base delay between attempts, doubled on each retry.
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            retry: 0,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl QueryConfig {
    /// Load query cache settings from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            stale_time: env::var("QUERY_STALE_TIME_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs),
            retry: parse_or("QUERY_RETRY", defaults.retry),
            retry_delay: env::var("QUERY_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn parse_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
