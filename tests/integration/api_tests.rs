//! REST control plane tests via `oneshot`

use crate::support::{orchestrator, Script, ScriptedWork};
use axum::http::StatusCode;
use crawl_rotor::server::{build_router, ApiKey};
use crawl_rotor::strategy::Policy;
use crawl_rotor::ControlSurface;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(probe_live: bool, api_key: Option<&str>) -> axum::Router {
    let work = ScriptedWork::new(Script::Succeed(3));
    let control = ControlSurface::new(Arc::new(orchestrator(
        Policy::default(),
        probe_live,
        work,
    )));
    build_router(Arc::new(control), ApiKey::new(api_key.map(str::to_string)))
}

fn app() -> axum::Router {
    app_with(true, None)
}

/// Send a request via `oneshot` and return (status, parsed JSON body)
async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "POST", uri, None).await
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

#[tokio::test]
async fn state_of_fresh_loop() {
    let (status, body) = get(app(), "/api/crawler/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRunning"], false);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["currentConcurrency"], 0);
    assert_eq!(body["totalProcessed"], 0);
    assert_eq!(body["avgLatency"], 0.0);
    assert_eq!(body["delayQualified"], true);
    assert_eq!(body["pushQualified"], true);
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let app = app();

    let (_, body) = post(app.clone(), "/api/crawler/start").await;
    assert_eq!(body, json!({"started": true}));
    let (_, body) = post(app.clone(), "/api/crawler/start").await;
    assert_eq!(body, json!({"started": false}));

    let (_, body) = get(app.clone(), "/api/crawler/state").await;
    assert_eq!(body["isRunning"], true);

    let (_, body) = post(app.clone(), "/api/crawler/stop").await;
    assert_eq!(body, json!({"stopped": true}));
    let (_, body) = post(app.clone(), "/api/crawler/stop").await;
    assert_eq!(body, json!({"stopped": false}));

    let (_, body) = get(app, "/api/crawler/state").await;
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_cycle_reports_and_records() {
    let app = app();

    let (status, body) = post(app.clone(), "/api/crawler/test-cycle").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["itemCount"], 3);
    assert_eq!(body["identity"], Value::Null);

    let (_, body) = get(app, "/api/crawler/state").await;
    assert_eq!(body["totalProcessed"], 3);
    assert_eq!(body["recentLatencies"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn default_policy() {
    let (status, body) = get(app(), "/api/anti-crawl/strategy").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "concurrencyLimit": 50,
            "cycleInterval": 60,
            "rotationInterval": 300,
            "retryCount": 3,
            "failThreshold": 3,
            "delayThreshold": 8,
            "targetSubject": "python",
            "maxItemsPerCycle": 10
        })
    );
}

#[tokio::test]
async fn policy_update_clamps() {
    let app = app();

    let (status, body) = post_json(
        app.clone(),
        "/api/anti-crawl/strategy/update",
        json!({"concurrencyLimit": 9999}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrencyLimit"], 100);

    let (_, body) = post_json(
        app.clone(),
        "/api/anti-crawl/strategy/update",
        json!({"crawlInterval": 1}),
    )
    .await;
    assert_eq!(body["cycleInterval"], 10);

    let (_, body) = get(app, "/api/anti-crawl/strategy").await;
    assert_eq!(body["concurrencyLimit"], 100);
    assert_eq!(body["cycleInterval"], 10);
}

#[tokio::test]
async fn policy_update_saturates_out_of_type_numbers() {
    let app = app();

    let (status, body) = post_json(
        app.clone(),
        "/api/anti-crawl/strategy/update",
        json!({"concurrencyLimit": 1e20}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrencyLimit"], 100);

    let (status, body) = post_json(
        app,
        "/api/anti-crawl/strategy/update",
        json!({"concurrencyLimit": 50.5, "failThreshold": -1e300}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrencyLimit"], 50);
    assert_eq!(body["failThreshold"], 1);
}

#[tokio::test]
async fn policy_update_skips_non_string_subject() {
    let (status, body) = post_json(
        app(),
        "/api/anti-crawl/strategy/update",
        json!({"concurrencyLimit": 20, "targetSubject": 123}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrencyLimit"], 20);
    assert_eq!(body["targetSubject"], "python");
}

#[tokio::test]
async fn policy_update_skips_non_numeric_values() {
    let (status, body) = post_json(
        app(),
        "/api/anti-crawl/strategy/update",
        json!({"retryCount": "7", "maxItemsPerCycle": [1, 2], "targetSubject": "Rust"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retryCount"], 7);
    assert_eq!(body["maxItemsPerCycle"], 10);
    assert_eq!(body["targetSubject"], "rust");
}

#[tokio::test]
async fn empty_policy_update_returns_current() {
    let (status, body) = post_json(app(), "/api/anti-crawl/strategy/update", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrencyLimit"], 50);
}

#[tokio::test]
async fn add_unreachable_identity() {
    let app = app_with(false, None);

    let (status, body) = post_json(
        app.clone(),
        "/api/anti-crawl/ip-pool/add",
        json!({"address": "1.2.3.4:7891", "protocol": "socks5"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"added": false}));

    let (_, body) = get(app, "/api/anti-crawl/ip-pool").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["valid"], 0);
    assert_eq!(body["invalid"], 1);
    assert_eq!(body["identities"][0]["address"], "1.2.3.4:7891");
    assert_eq!(body["identities"][0]["protocol"], "socks5");
    assert_eq!(body["identities"][0]["valid"], false);
}

#[tokio::test]
async fn add_and_remove_identity() {
    let app = app();

    let (_, body) = post_json(
        app.clone(),
        "/api/anti-crawl/ip-pool/add",
        json!({"ip": "1.2.3.4:7891"}),
    )
    .await;
    assert_eq!(body, json!({"added": true}));

    let (_, body) = post_json(
        app.clone(),
        "/api/anti-crawl/ip-pool/add",
        json!({"ip": "1.2.3.4:7891"}),
    )
    .await;
    assert_eq!(body, json!({"added": false}));

    let (_, body) = get(app.clone(), "/api/anti-crawl/ip-pool").await;
    assert_eq!(body["validRate"], 100.0);
    assert_eq!(body["identities"][0]["protocol"], "http");

    let (status, body) = post(
        app.clone(),
        "/api/anti-crawl/ip-pool/remove?address=1.2.3.4:7891",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"removed": true}));

    let (_, body) = post(app, "/api/anti-crawl/ip-pool/remove?address=1.2.3.4:7891").await;
    assert_eq!(body, json!({"removed": false}));
}

#[tokio::test]
async fn malformed_identity_is_bad_request() {
    let app = app();

    let (status, body) = post_json(
        app.clone(),
        "/api/anti-crawl/ip-pool/add",
        json!({"address": "1.2.3.4"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Malformed address"));

    let (status, _) = post_json(
        app.clone(),
        "/api/anti-crawl/ip-pool/add",
        json!({"address": "1.2.3.4:80", "protocol": "gopher"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app.clone(), "/api/anti-crawl/ip-pool/remove").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(app, "/api/anti-crawl/ip-pool").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn api_key_guards_routes() {
    let app = app_with(true, Some("s3cret"));

    let (status, body) = get(app.clone(), "/api/crawler/state").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "unauthorized"}));

    let (status, _) = post(app.clone(), "/api/crawler/start?api_key=wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(app, "/api/crawler/state?api_key=s3cret").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRunning"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = get(app(), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
