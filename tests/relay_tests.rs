// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relay tests: health check, CORS policy, catch-all error handling and the
//! backend pass-through.

use axum::{
    body::Body,
    extract::Request as AxumRequest,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use prayer_circle::config::Config;
use prayer_circle::routes::proxy;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, create_test_app_with_config, spawn_server, WEB_ORIGIN};

async fn panicking_route() -> &'static str {
    panic!("route table failure")
}

fn failing_route_table() -> Router<std::sync::Arc<prayer_circle::AppState>> {
    Router::new().route("/api/groups/mine", get(panicking_route))
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ─── Health ──────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_healthy() {
    let (app, state) = create_test_app(Router::new());

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], state.config.service_name.as_str());

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    assert!(timestamp.ends_with('Z'));
}

#[tokio::test]
async fn test_health_independent_of_route_table() {
    let (app, _) = create_test_app(failing_route_table());

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

// ─── Error boundary ──────────────────────────────────────────

#[tokio::test]
async fn test_route_panic_returns_generic_500() {
    let (app, _) = create_test_app(failing_route_table());

    let response = app
        .clone()
        .oneshot(get_request("/api/groups/mine"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "internal_error" })
    );

    // The relay keeps serving after the failure.
    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = create_test_app(Router::new());

    let response = app.oneshot(get_request("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_malformed_json_rejected_before_route_table() {
    let table = Router::new().route("/api/requests", post(|| async { StatusCode::CREATED }));
    let (app, _) = create_test_app(table);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/requests")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"title\":"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── CORS ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let (app, _) = create_test_app(failing_route_table());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/groups/mine")
                .header(header::ORIGIN, WEB_ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        WEB_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_rejects_unlisted_origin() {
    let (app, _) = create_test_app(Router::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_cors_uses_configured_origins() {
    let config = Config {
        allowed_origins: vec!["https://pray.example.org".to_string()],
        ..Config::default()
    };
    let (app, _) = create_test_app_with_config(config, Router::new());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://pray.example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://pray.example.org"
    );

    // The default dev origin is no longer allowed.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, WEB_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// ─── Backend pass-through ────────────────────────────────────

/// Minimal stand-in for the backend API.
fn fake_backend() -> Router {
    Router::new()
        .route(
            "/api/groups/mine",
            get(|headers: axum::http::HeaderMap| async move {
                let cookie = headers
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if cookie != "sid=abc" {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!([
                    { "id": "g1", "name": "Morning Prayer", "memberCount": 4 }
                ]))
                .into_response()
            }),
        )
        .route(
            "/api/logout",
            get(|| async {
                (
                    [(header::SET_COOKIE, "sid=; Max-Age=0; Path=/")],
                    Redirect::to("/"),
                )
            }),
        )
        .route(
            "/api/open",
            get(|| async {
                (
                    [
                        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "https://evil.example"),
                        (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"),
                    ],
                    Json(json!({ "ok": true })),
                )
            }),
        )
        .route(
            "/api/echo",
            post(|request: AxumRequest| async move {
                let query = request.uri().query().unwrap_or_default().to_string();
                let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
                    .await
                    .unwrap();
                let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                Json(json!({ "query": query, "body": body }))
            }),
        )
}

fn relay_to(backend_url: String) -> Router {
    let config = Config {
        backend_url,
        ..Config::default()
    };
    create_test_app_with_config(config, proxy::routes()).0
}

#[tokio::test]
async fn test_relay_forwards_with_cookies() {
    let backend = spawn_server(fake_backend()).await;
    let app = relay_to(backend);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/groups/mine")
                .header(header::ORIGIN, WEB_ORIGIN)
                .header(header::COOKIE, "sid=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        WEB_ORIGIN
    );
    let body = body_json(response).await;
    assert_eq!(body[0]["name"], "Morning Prayer");
}

#[tokio::test]
async fn test_relay_passes_upstream_status_through() {
    let backend = spawn_server(fake_backend()).await;
    let app = relay_to(backend);

    let response = app.oneshot(get_request("/api/groups/mine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_relay_does_not_follow_logout_redirect() {
    let backend = spawn_server(fake_backend()).await;
    let app = relay_to(backend);

    let response = app.oneshot(get_request("/api/logout")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    assert!(response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
}

#[tokio::test]
async fn test_relay_ignores_backend_cors_headers() {
    let backend = spawn_server(fake_backend()).await;
    let app = relay_to(backend);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/open")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));

    // An allowed origin still gets exactly the relay's own answer.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/open")
                .header(header::ORIGIN, WEB_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let origins = response.headers().get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    assert_eq!(origins.iter().count(), 1);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        WEB_ORIGIN
    );
}

#[tokio::test]
async fn test_relay_forwards_json_body_and_query() {
    let backend = spawn_server(fake_backend()).await;
    let app = relay_to(backend);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/echo?page=2")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Healing for Sam"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["query"], "page=2");
    assert_eq!(body["body"]["title"], "Healing for Sam");
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let app = relay_to(common::unused_base_url().await);

    let response = app.oneshot(get_request("/api/groups/mine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "upstream_error");
}
