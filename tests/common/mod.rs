// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use field_mapper::config::Config;
use field_mapper::routes::create_router;
use field_mapper::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app with the default configuration.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    (create_router(state.clone()), state)
}

/// Send one request and decode the response body: JSON when it parses,
/// the raw text otherwise, `Null` when empty.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Create a session and return its id.
#[allow(dead_code)]
pub async fn create_session(app: &Router) -> u64 {
    let (status, json) = send(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    json["session_id"].as_u64().unwrap()
}

/// Draw a closed field by clicking the given viewport pixels.
#[allow(dead_code)]
pub async fn draw_field(app: &Router, session: u64, pixels: &[(f64, f64)]) -> Value {
    let (status, _) = send(app, "POST", &format!("/api/sessions/{session}/fields/new"), None).await;
    assert_eq!(status, StatusCode::OK);
    for &(x, y) in pixels {
        pointer(app, session, serde_json::json!({ "kind": "click", "x": x, "y": y })).await;
    }
    let (_, json) = pointer(
        app,
        session,
        serde_json::json!({ "kind": "double_click", "x": 0.0, "y": 0.0 }),
    )
    .await;
    json["scene"].clone()
}

#[allow(dead_code)]
pub async fn pointer(app: &Router, session: u64, event: Value) -> (StatusCode, Value) {
    send(app, "POST", &format!("/api/sessions/{session}/events"), Some(event)).await
}
