// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Network seam of the query client.

use super::QueryKey;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

/// Query failure. `Clone` so the last error can live in cached state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Transport failures and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Unauthorized | FetchError::Decode(_) => false,
        }
    }
}

/// Performs the request behind a query key.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, FetchError>;
}

/// Fetcher that issues `GET {base_url}{key}` over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Create a fetcher for the relay at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_headers(base_url, timeout, HeaderMap::new())
    }

    /// Create a fetcher that sends `headers` (e.g. a session cookie) on
    /// every request.
    pub fn with_headers(
        base_url: impl Into<String>,
        timeout: Duration,
        headers: HeaderMap,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json(response: reqwest::Response) -> Result<Value, FetchError> {
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(FetchError::Unauthorized);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, key);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        Self::check_response_json(response).await
    }
}
