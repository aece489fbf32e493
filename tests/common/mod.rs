// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::response::Response;
use prayer_circle::config::Config;
use prayer_circle::query::{FetchError, Fetcher, QueryKey};
use prayer_circle::routes::create_router;
use prayer_circle::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// Origin the default test config allows.
#[allow(dead_code)]
pub const WEB_ORIGIN: &str = "http://localhost:5173";

/// Create a relay around `route_table` with the default test config.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(route_table: axum::Router<Arc<AppState>>) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::default(), route_table)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    route_table: axum::Router<Arc<AppState>>,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
    (create_router(state.clone(), route_table), state)
}

/// Serve `app` on an ephemeral local port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
#[allow(dead_code)]
pub async fn unused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Fetcher that returns scripted results in order (the last one repeats)
/// and counts calls.
#[allow(dead_code)]
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    script: Mutex<Vec<Result<Value, FetchError>>>,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new(script: Vec<Result<Value, FetchError>>) -> Arc<Self> {
        assert!(!script.is_empty());
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script),
        })
    }

    pub fn always(result: Result<Value, FetchError>) -> Arc<Self> {
        Self::new(vec![result])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _key: &QueryKey) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

/// A request held open until the test answers it.
#[allow(dead_code)]
pub struct PendingFetch {
    pub key: QueryKey,
    respond: oneshot::Sender<Result<Value, FetchError>>,
}

#[allow(dead_code)]
impl PendingFetch {
    pub fn respond(self, result: Result<Value, FetchError>) {
        let _ = self.respond.send(result);
    }
}

/// Fetcher whose requests stay pending until the test resolves them.
#[allow(dead_code)]
pub struct ControlledFetcher {
    calls: AtomicUsize,
    pending: mpsc::UnboundedSender<PendingFetch>,
}

#[allow(dead_code)]
impl ControlledFetcher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingFetch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                pending: tx,
            }),
            rx,
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ControlledFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (respond, answer) = oneshot::channel();
        let _ = self.pending.send(PendingFetch {
            key: key.clone(),
            respond,
        });
        answer
            .await
            .unwrap_or_else(|_| Err(FetchError::Transport("request dropped".to_string())))
    }
}

/// Let spawned tasks run to their next suspension point.
#[allow(dead_code)]
pub async fn let_tasks_run() {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
