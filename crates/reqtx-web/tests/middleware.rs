//! End-to-end: router + transaction middleware + in-memory store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::put;
use axum::{middleware, Extension, Router};
use tokio::sync::Notify;
use tower::ServiceExt;

use reqtx_web::app_state::AppState;
use reqtx_web::config;
use reqtx_web::context::RequestItems;
use reqtx_web::middleware::transaction_middleware;
use reqtx_web::router::build_router;
use reqtx_web::services::items;

fn state() -> AppState {
    let cfg = config::load_from_str(include_str!("../../../reqtx.yaml")).unwrap();
    AppState::new(cfg).unwrap()
}

fn request(method: &str, uri: &str, body: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_json(res: Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn successful_write_is_committed() {
    let state = state();
    let app = build_router(state.clone());
    assert_eq!(state.coordinator().cacheable(), None);

    let res = send(&app, request("PUT", "/items/a", "apple")).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let store = state.sessions().store().clone();
    assert_eq!(store.get("a").as_deref(), Some("apple"));
    assert_eq!(state.metrics().count("committed"), 1);
    assert_eq!(state.coordinator().cacheable(), Some(true));

    let res = send(&app, request("GET", "/items/a", "")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["value"], "apple");
    assert_eq!(state.metrics().count("skipped"), 1);
}

#[tokio::test]
async fn rejected_request_is_rolled_back() {
    let state = state();
    let app = build_router(state.clone());

    let res = send(&app, request("POST", "/items/a/reject", "apple")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    assert!(state.sessions().store().is_empty());
    assert_eq!(state.metrics().count("rolled_back"), 1);
    assert_eq!(state.metrics().count("committed"), 0);
}

#[tokio::test]
async fn simulated_write_returns_success_but_never_persists() {
    let state = state();
    let app = build_router(state.clone());

    let mut req = request("PUT", "/items/a", "apple");
    req.headers_mut().insert("X-REQUEST-SIMULATION", "yes".parse().unwrap());
    let res = send(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(state.sessions().store().is_empty());
    assert_eq!(state.metrics().count("rolled_back"), 1);
}

#[tokio::test]
async fn flush_failure_surfaces_as_server_error() {
    let state = state();
    let app = build_router(state.clone());

    let res = send(&app, request("PUT", "/items/a", "")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["code"], "STORE_FAILED");

    assert!(state.sessions().store().is_empty());
    assert_eq!(state.metrics().count("commit_failed"), 1);
    assert_eq!(state.metrics().count("rolled_back"), 1);
}

#[tokio::test]
async fn opted_out_endpoint_runs_without_transaction() {
    let state = state();
    let app = build_router(state.clone());

    let res = send(&app, request("GET", "/items/missing", "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.metrics().count("skipped"), 1);
    assert_eq!(state.metrics().count("begun"), 0);
}

#[tokio::test]
async fn unmatched_routes_and_ops_bypass_the_middleware() {
    let state = state();
    let app = build_router(state.clone());

    let res = send(&app, request("GET", "/nope", "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = send(&app, request("GET", "/healthz", "")).await;
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(state.coordinator().cacheable(), None);
    assert_eq!(state.metrics().count("skipped"), 0);
}

#[tokio::test]
async fn metrics_endpoint_renders_outcomes() {
    let state = state();
    let app = build_router(state.clone());

    send(&app, request("PUT", "/items/a", "apple")).await;
    let res = send(&app, request("GET", "/metrics", "")).await;
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("# TYPE reqtx_transactions_total counter"));
    assert!(text.contains(r#"reqtx_transactions_total{outcome="committed"} 1"#));
}

#[tokio::test]
async fn middleware_installed_twice_is_a_programming_error() {
    let state = state();
    let app = Router::new()
        .route("/items/:key", put(items::put_item))
        .route_layer(middleware::from_fn_with_state(
            state.coordinator(),
            transaction_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.coordinator(),
            transaction_middleware,
        ))
        .with_state(state.clone());

    let res = send(&app, request("PUT", "/items/a", "apple")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["code"], "PROGRAMMING_ERROR");

    assert!(state.sessions().store().is_empty());
    assert_eq!(state.metrics().count("begun"), 1);
    assert_eq!(state.metrics().count("rolled_back"), 1);
}

#[tokio::test]
async fn dropped_request_is_rolled_back() {
    let cfg = config::load_from_str(
        r#"
version: 1
controllers:
  - name: "slow"
    transactional: true
    actions:
      - route: "PUT /slow/:key"
"#,
    )
    .unwrap();
    let state = AppState::new(cfg).unwrap();
    let entered = Arc::new(Notify::new());

    let sessions = state.sessions();
    let signal = Arc::clone(&entered);
    let app = Router::new()
        .route(
            "/slow/:key",
            put(move |Extension(items): Extension<RequestItems>| async move {
                sessions.session(&items).unwrap().put("slow", "value").unwrap();
                signal.notify_one();
                std::future::pending::<StatusCode>().await
            }),
        )
        .route_layer(middleware::from_fn_with_state(
            state.coordinator(),
            transaction_middleware,
        ))
        .with_state(state.clone());

    let in_flight = tokio::spawn(app.oneshot(request("PUT", "/slow/a", "")));
    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .unwrap();
    in_flight.abort();

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.metrics().count("rolled_back") == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert!(state.sessions().store().is_empty());
    assert_eq!(state.metrics().count("committed"), 0);
}
