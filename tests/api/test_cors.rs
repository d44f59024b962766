// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cross-origin access: any origin with credentials, any method, any header

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};

use super::support::{detect_request, png, router_with, send, FixedDetector};

const ORIGIN: &str = "http://localhost:3000";

#[tokio::test]
async fn test_simple_request_mirrors_origin() {
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, ORIGIN)
        .body(Body::empty())
        .unwrap();

    let response = send(router_with(FixedDetector::new(vec![])), request).await;
    let headers = response.headers();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_any_origin_allowed() {
    for origin in ["https://recircle.example", "http://192.168.1.20:8080"] {
        let mut request = detect_request(&png(8, 8));
        request
            .headers_mut()
            .insert(header::ORIGIN, origin.parse().unwrap());

        let response = send(router_with(FixedDetector::new(vec![])), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], origin);
    }
}

#[tokio::test]
async fn test_preflight_allows_method_and_headers() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/detect/")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-client-id,authorization")
        .body(Body::empty())
        .unwrap();

    let response = send(router_with(FixedDetector::new(vec![])), request).await;
    let headers = response.headers();

    assert!(response.status().is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "x-client-id,authorization"
    );
}

#[tokio::test]
async fn test_error_responses_carry_cors_headers() {
    let mut request = detect_request(b"not an image");
    request
        .headers_mut()
        .insert(header::ORIGIN, ORIGIN.parse().unwrap());

    let response = send(router_with(FixedDetector::new(vec![])), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
}
