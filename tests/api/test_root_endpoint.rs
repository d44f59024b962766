// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET / liveness endpoint

use axum::{
    body::Body,
    http::{Request, StatusCode},
};

use super::support::{body_json, router_with, send, FailingDetector, FixedDetector};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_reports_running() {
    let response = send(router_with(FixedDetector::new(vec![])), get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "status": "Backend running" })
    );
}

#[tokio::test]
async fn test_root_independent_of_detector_health() {
    let response = send(router_with(FailingDetector), get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Backend running");
}

#[tokio::test]
async fn test_root_is_idempotent() {
    let router = router_with(FixedDetector::new(vec![]));
    for _ in 0..3 {
        let response = send(router.clone(), get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "Backend running");
    }
}

#[tokio::test]
async fn test_detect_rejects_get() {
    let response = send(router_with(FixedDetector::new(vec![])), get("/detect/")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = send(router_with(FixedDetector::new(vec![])), get("/predict")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
