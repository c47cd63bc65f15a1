//! HTTP surface driven in-process through the router

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{outcome, test_config, ScriptedOutcomes};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wingo::{api::ApiServer, games::types::Color, MemoryStore, ServiceBuilder, ServiceContainer};

async fn setup() -> (ServiceContainer, Router) {
    let services = ServiceBuilder::new(test_config(5000))
        .with_store(Arc::new(MemoryStore::new()))
        .with_outcomes(ScriptedOutcomes::boxed(vec![outcome(Color::Red, 4)]))
        .build()
        .await
        .unwrap();
    let app = ApiServer::new(services.config().api.clone(), &services).create_app();
    (services, app)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_version() {
    let (_services, app) = setup().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["engine_running"], false);
}

#[tokio::test]
async fn test_current_round_is_empty_before_first_tick() {
    let (_services, app) = setup().await;
    let (status, body) = send(&app, get("/api/round/current")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["round"].is_null());
    assert!(body["server_time"].is_string());
}

#[tokio::test]
async fn test_bet_flow_over_http() {
    let (services, app) = setup().await;
    services.engine().run_tick().await.unwrap();

    let (status, body) = send(&app, get("/api/round/current")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["round"]["period"], "WG001");
    assert_eq!(body["round"]["betting_open"], true);
    assert!(body["round"].get("color").is_none());

    let (status, user) = send(&app, post("/api/users", json!({ "username": "henry" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["balance"], "50.00");
    let user_id = user["id"].as_str().unwrap().to_string();

    let (status, placed) = send(
        &app,
        post(
            "/api/bets",
            json!({ "user_id": user_id, "kind": "color", "value": "red", "amount": "10.00", "period": "WG001" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["balance"], "40.00");
    assert_eq!(placed["period"], "WG001");

    services.engine().run_tick().await.unwrap();

    let (_, user) = send(&app, get(&format!("/api/users/{}", user_id))).await;
    assert_eq!(user["balance"], "59.50");

    let (status, bets) = send(&app, get(&format!("/api/users/{}/bets?limit=5", user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bets["bets"][0]["status"], "won");
    assert_eq!(bets["bets"][0]["payout"], "19.50");

    let (status, history) = send(&app, get("/api/round/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["rounds"].as_array().unwrap().len(), 1);
    assert_eq!(history["rounds"][0]["period"], "WG001");
    assert_eq!(history["rounds"][0]["color"], "red");
}

#[tokio::test]
async fn test_error_statuses() {
    let (services, app) = setup().await;

    let (_, user) = send(&app, post("/api/users", json!({ "username": "iris" }))).await;
    let user_id = user["id"].as_str().unwrap().to_string();

    // No round has opened yet
    let (status, body) = send(
        &app,
        post("/api/bets", json!({ "user_id": user_id, "kind": "color", "value": "red", "amount": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert!(body["request_id"].is_string());

    services.engine().run_tick().await.unwrap();

    let (status, body) = send(
        &app,
        post("/api/bets", json!({ "user_id": user_id, "kind": "color", "value": "red", "amount": "80.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["available"], "50.00");

    let (status, _) = send(
        &app,
        post("/api/bets", json!({ "user_id": user_id, "kind": "number", "value": "12", "amount": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post("/api/users", json!({ "username": "IRIS" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, get(&format!("/api/users/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (_services, app) = setup().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_metrics_endpoint_is_prometheus_text() {
    let (services, app) = setup().await;
    services.engine().run_tick().await.unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("wingo_rounds_opened_total 1"));
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests_with_request_id() {
    let (services, app) = setup().await;
    services.engine().run_tick().await.unwrap();

    let (_, user) = send(&app, post("/api/users", json!({ "username": "jules" }))).await;
    let user_id = user["id"].as_str().unwrap().to_string();

    let malformed = [
        json!({ "user_id": user_id, "kind": "dice", "value": "red", "amount": "1.00" }),
        json!({ "user_id": user_id, "kind": "color", "value": "red", "amount": "-1.00" }),
        json!({ "user_id": user_id, "kind": "color", "value": "red" }),
    ];
    for body in malformed {
        let (status, error) = send(&app, post("/api/bets", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(error["error"]["code"], "BAD_REQUEST");
        assert!(error["error"]["message"].as_str().unwrap().starts_with("Invalid bet"));
        assert!(error["request_id"].is_string());
    }

    let (status, error) = send(&app, post("/api/users", json!({ "name": "jules" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["request_id"].is_string());

    // Nothing was debited by the rejected requests
    let (_, user) = send(&app, get(&format!("/api/users/{}", user_id))).await;
    assert_eq!(user["balance"], "50.00");
}
