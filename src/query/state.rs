// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cached query state and the typed view handed to observers.

use super::FetchError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Untyped per-key state, broadcast to every observer of the key.
#[derive(Debug, Clone)]
pub(crate) struct EntryState {
    /// Last good data. Survives failed refreshes.
    pub data: Option<Arc<Value>>,
    pub status: QueryStatus,
    pub error: Option<FetchError>,
    /// When `data` was last written by a successful fetch.
    pub updated_at: Option<Instant>,
    pub is_fetching: bool,
}

impl EntryState {
    pub fn idle() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            updated_at: None,
            is_fetching: false,
        }
    }

    /// Whether the entry can be served without a new request.
    pub fn is_fresh(&self, stale_time: Option<Duration>) -> bool {
        match (self.status, self.updated_at) {
            (QueryStatus::Success, Some(at)) => stale_time.map_or(true, |ttl| at.elapsed() < ttl),
            _ => false,
        }
    }
}

/// Snapshot of a query as seen by one observer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<FetchError>,
    /// First load in progress with nothing to show yet.
    pub is_loading: bool,
    /// Any request in flight, including background refreshes.
    pub is_fetching: bool,
    pub is_error: bool,
}

impl<T> QueryResult<T> {
    /// Result of a query whose gate is closed: no data, not loading, no
    /// error.
    pub fn disabled() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_loading: false,
            is_fetching: false,
            is_error: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

impl<T: Clone + Default> QueryResult<T> {
    /// Cached data, or the empty value for the type (an empty list for
    /// list-shaped keys).
    pub fn data_or_default(&self) -> T {
        self.data.clone().unwrap_or_default()
    }
}

impl<T: DeserializeOwned> QueryResult<T> {
    pub(crate) fn from_state(state: &EntryState) -> Self {
        let mut status = state.status;
        let mut error = state.error.clone();

        let data = match state.data.as_deref().map(|value| T::deserialize(value)) {
            Some(Ok(data)) => Some(data),
            Some(Err(e)) => {
                status = QueryStatus::Error;
                error = Some(FetchError::Decode(e.to_string()));
                None
            }
            None => None,
        };

        Self {
            is_loading: status == QueryStatus::Loading && data.is_none(),
            is_fetching: state.is_fetching,
            is_error: status == QueryStatus::Error,
            data,
            status,
            error,
        }
    }
}
