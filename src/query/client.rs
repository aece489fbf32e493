// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared query cache with per-key request deduplication.
//!
//! Each key owns a `watch` channel carrying its [`EntryState`] and a small
//! request log. Requests are numbered per key; a response is applied only if
//! no newer response has been applied already, so a slow stale response can
//! never overwrite fresher data. Cache writes happen only in
//! [`Entry::complete`], which runs when a fetch task finishes.

use super::state::EntryState;
use super::{FetchError, Fetcher, QueryKey, QueryResult, QueryStatus};
use crate::config::QueryConfig;
use dashmap::DashMap;
use futures_util::{FutureExt, Stream};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Upper bound for the exponential retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Process-wide query cache.
///
/// Cloning is cheap and every clone shares the same cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    config: QueryConfig,
    entries: DashMap<QueryKey, Arc<Entry>>,
    runtime: Handle,
    closed: AtomicBool,
}

struct Entry {
    state: watch::Sender<EntryState>,
    requests: Mutex<RequestLog>,
}

#[derive(Default)]
struct RequestLog {
    /// Id of the most recently issued request.
    latest: u64,
    /// Id of the newest request whose response was applied.
    applied: u64,
    running: Vec<(u64, AbortHandle)>,
}

impl RequestLog {
    fn latest_in_flight(&self) -> bool {
        self.running.iter().any(|(id, _)| *id == self.latest)
    }
}

impl Entry {
    fn new() -> Self {
        let (state, _) = watch::channel(EntryState::idle());
        Self {
            state,
            requests: Mutex::new(RequestLog::default()),
        }
    }

    fn log(&self) -> MutexGuard<'_, RequestLog> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the outcome of request `id`.
    fn complete(&self, key: &QueryKey, id: u64, result: Result<Value, FetchError>) {
        let mut log = self.log();
        log.running.retain(|(running, _)| *running != id);

        if id < log.applied {
            tracing::debug!(key = %key, request = id, "Discarding superseded response");
            return;
        }
        log.applied = id;
        let settled = id == log.latest;

        self.state.send_modify(|state| {
            match result {
                Ok(value) => {
                    state.data = Some(Arc::new(value));
                    state.error = None;
                    state.updated_at = Some(Instant::now());
                    if settled {
                        state.status = QueryStatus::Success;
                    }
                }
                // Last good data stays in place.
                Err(err) => {
                    state.error = Some(err);
                    if settled {
                        state.status = QueryStatus::Error;
                    }
                }
            }
            state.is_fetching = !settled;
        });
    }
}

impl QueryClient {
    /// Create a query client bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(fetcher: Arc<dyn Fetcher>, config: QueryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                config,
                entries: DashMap::new(),
                runtime: Handle::current(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    /// Subscribe to `key`.
    ///
    /// With `enabled == false` no request is issued and the observer reports
    /// no data, not loading and no error. Otherwise a request is started
    /// unless the key is fresh or already being fetched, in which case the
    /// observer shares the existing result.
    pub fn observe<T: DeserializeOwned>(
        &self,
        key: impl Into<QueryKey>,
        enabled: bool,
    ) -> QueryObserver<T> {
        let key = key.into();
        if !enabled {
            tracing::trace!(key = %key, "Query disabled, not fetching");
            return QueryObserver::disabled(key);
        }
        if self.is_closed() {
            tracing::warn!(key = %key, "Query client is shut down, not fetching");
            return QueryObserver::disabled(key);
        }

        let entry = self.entry(&key);
        let rx = entry.state.subscribe();

        let mut log = entry.log();
        if log.latest_in_flight() {
            tracing::debug!(key = %key, request = log.latest, "Joining in-flight query");
        } else if !entry.state.borrow().is_fresh(self.inner.config.stale_time) {
            self.start_fetch(&key, &entry, &mut log);
        }
        drop(log);

        QueryObserver {
            key,
            client: Some(self.clone()),
            rx: Some(rx),
            _marker: PhantomData,
        }
    }

    /// Read the cached value for `key` without subscribing or fetching.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> QueryResult<T> {
        match self.inner.entries.get(key) {
            Some(entry) => QueryResult::from_state(&entry.state.borrow()),
            None => QueryResult::disabled(),
        }
    }

    /// Issue a new request for `key`, superseding any request in flight.
    pub fn refetch(&self, key: impl Into<QueryKey>) {
        let key = key.into();
        if self.is_closed() {
            return;
        }

        let entry = self.entry(&key);
        let mut log = entry.log();
        self.start_fetch(&key, &entry, &mut log);
    }

    /// Mark `key` stale and refetch it if anything is observing it.
    pub fn invalidate(&self, key: &QueryKey) {
        let Some(entry) = self.inner.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return;
        };

        entry.state.send_if_modified(|state| {
            state.updated_at = None;
            false
        });

        if entry.state.receiver_count() > 0 && !self.is_closed() {
            let mut log = entry.log();
            self.start_fetch(key, &entry, &mut log);
        }
    }

    /// Abort running requests and drop every cache entry.
    ///
    /// Observers see their channel close; later `observe` calls behave as if
    /// disabled.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut aborted = 0usize;
        for entry in self.inner.entries.iter() {
            for (_, handle) in entry.value().log().running.drain(..) {
                handle.abort();
                aborted += 1;
            }
        }
        self.inner.entries.clear();

        tracing::info!(aborted, "Query client shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn entry(&self, key: &QueryKey) -> Arc<Entry> {
        Arc::clone(
            &self
                .inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Entry::new())),
        )
    }

    /// Spawn request `latest + 1` for `key`. The caller holds the request log.
    fn start_fetch(&self, key: &QueryKey, entry: &Arc<Entry>, log: &mut RequestLog) {
        log.latest += 1;
        let id = log.latest;

        entry.state.send_modify(|state| {
            state.status = QueryStatus::Loading;
            state.is_fetching = true;
        });
        tracing::debug!(key = %key, request = id, "Fetching query");

        let inner = Arc::clone(&self.inner);
        let task_entry = Arc::clone(entry);
        let task_key = key.clone();
        let task = self.inner.runtime.spawn(async move {
            let fetch = fetch_with_retry(inner.fetcher.as_ref(), &task_key, &inner.config);
            let result = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(key = %task_key, request = id, "Query fetch panicked");
                    Err(FetchError::Transport("fetch panicked".to_string()))
                }
            };
            task_entry.complete(&task_key, id, result);
        });

        log.running.push((id, task.abort_handle()));
    }
}

async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    key: &QueryKey,
    config: &QueryConfig,
) -> Result<Value, FetchError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(key).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.retry && err.is_retryable() => {
                let delay = retry_delay(config.retry_delay, attempt);
                tracing::warn!(
                    key = %key,
                    error = %err,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Query failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Query failed");
                return Err(err);
            }
        }
    }
}

/// `base * 2^attempt`, capped at [`MAX_RETRY_DELAY`].
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// One subscriber to a query key.
///
/// Dropping the observer unsubscribes without cancelling the shared request.
pub struct QueryObserver<T> {
    key: QueryKey,
    client: Option<QueryClient>,
    rx: Option<watch::Receiver<EntryState>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> QueryObserver<T> {
    fn disabled(key: QueryKey) -> Self {
        Self {
            key,
            client: None,
            rx: None,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.rx.is_some()
    }

    /// Current snapshot.
    pub fn current(&self) -> QueryResult<T> {
        match &self.rx {
            Some(rx) => QueryResult::from_state(&rx.borrow()),
            None => QueryResult::disabled(),
        }
    }

    /// Wait for the next state transition.
    ///
    /// Returns `None` for a disabled observer or once the client has shut
    /// down.
    pub async fn changed(&mut self) -> Option<QueryResult<T>> {
        let rx = self.rx.as_mut()?;
        rx.changed().await.ok()?;
        let state = rx.borrow_and_update();
        Some(QueryResult::from_state(&state))
    }

    /// Wait until no request is in flight and return that snapshot.
    pub async fn settled(&mut self) -> QueryResult<T> {
        loop {
            let current = self.current();
            if !current.is_fetching {
                return current;
            }
            if self.changed().await.is_none() {
                return self.current();
            }
        }
    }

    /// Refetch this key. Does nothing for a disabled observer.
    pub fn refetch(&self) {
        if let Some(client) = &self.client {
            client.refetch(self.key.clone());
        }
    }

    /// Every subsequent snapshot, as a stream.
    pub fn into_stream(self) -> impl Stream<Item = QueryResult<T>> {
        futures_util::stream::unfold(self, |mut observer| async move {
            let next = observer.changed().await?;
            Some((next, observer))
        })
    }
}
