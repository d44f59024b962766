// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect/ endpoint
//!
//! Runs the router against stub detectors so the HTTP contract can be
//! checked without model weights.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use image::ImageFormat;
use recircle_od::vision::{RawDetection, MAX_IMAGE_DIMENSION};

use super::support::{
    body_json, detect_request, detect_request_with_field, encode_image, png, router_with, send,
    EchoDimensionsDetector, FailingDetector, FixedDetector, BOUNDARY,
};

fn sample_detections() -> Vec<RawDetection> {
    vec![
        RawDetection { bbox: [10.0, 20.0, 110.0, 220.0], confidence: 0.91, class_id: 39 },
        RawDetection { bbox: [0.0, 0.0, 50.5, 60.25], confidence: 0.47, class_id: 0 },
        RawDetection { bbox: [5.0, 5.0, 15.0, 15.0], confidence: 0.47, class_id: 41 },
    ]
}

#[tokio::test]
async fn test_no_objects_returns_empty_array() {
    let router = router_with(FixedDetector::new(vec![]));
    let response = send(router, detect_request(&png(64, 48))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_detections_are_returned_in_order() {
    let router = router_with(FixedDetector::new(sample_detections()));
    let response = send(router, detect_request(&png(320, 240))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = body_json(response).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["class"], "bottle");
    assert_eq!(records[0]["bbox"], serde_json::json!([10.0, 20.0, 110.0, 220.0]));
    assert!((records[0]["confidence"].as_f64().unwrap() - 0.91).abs() < 1e-6);

    assert_eq!(records[1]["class"], "person");
    assert_eq!(records[1]["bbox"], serde_json::json!([0.0, 0.0, 50.5, 60.25]));
    assert_eq!(records[2]["class"], "cup");
}

#[tokio::test]
async fn test_record_shape() {
    let router = router_with(FixedDetector::new(sample_detections()));
    let body = body_json(send(router, detect_request(&png(32, 32))).await).await;

    for record in body.as_array().unwrap() {
        let object = record.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["bbox"].as_array().unwrap().len(), 4);
        assert!(object["confidence"].is_number());
        assert!(object["class"].is_string());
    }
}

#[tokio::test]
async fn test_accepts_common_formats() {
    for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
        let router = router_with(EchoDimensionsDetector);
        let response = send(router, detect_request(&encode_image(40, 30, format))).await;

        assert_eq!(response.status(), StatusCode::OK, "format {:?}", format);
        let body = body_json(response).await;
        assert_eq!(body[0]["bbox"], serde_json::json!([0.0, 0.0, 40.0, 30.0]));
    }
}

#[tokio::test]
async fn test_trailing_slash_optional() {
    let router = router_with(FixedDetector::new(vec![]));
    let mut request = detect_request(&png(8, 8));
    *request.uri_mut() = "/detect".parse().unwrap();

    let response = send(router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_random_bytes_rejected() {
    let router = router_with(FixedDetector::new(sample_detections()));
    let response = send(router, detect_request(b"this is definitely not an image")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_image");
}

#[tokio::test]
async fn test_truncated_image_rejected() {
    let mut bytes = png(64, 64);
    bytes.truncate(40);

    let router = router_with(FixedDetector::new(sample_detections()));
    let response = send(router, detect_request(&bytes)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_dimensions_rejected() {
    let router = router_with(FixedDetector::new(sample_detections()));
    let response = send(router, detect_request(&png(MAX_IMAGE_DIMENSION * 2, 1))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_image");
}

#[tokio::test]
async fn test_empty_file_rejected() {
    let router = router_with(FixedDetector::new(vec![]));
    let response = send(router, detect_request(&[])).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_missing_file_field_rejected() {
    let router = router_with(FixedDetector::new(vec![]));
    let response = send(router, detect_request_with_field("image", &png(8, 8))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
    assert!(body["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/detect/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"abc"}"#))
        .unwrap();

    let response = send(router_with(FixedDetector::new(vec![])), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_malformed_multipart_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/detect/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from("garbage without any boundary"))
        .unwrap();

    let response = send(router_with(FixedDetector::new(vec![])), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_failure_is_generic_500() {
    let response = send(router_with(FailingDetector), detect_request(&png(16, 16))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "internal_error");

    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("GPU"));
    assert!(!message.contains("/opt/models"));
}

#[tokio::test]
async fn test_repeated_uploads_are_deterministic() {
    let router = router_with(FixedDetector::new(sample_detections()));
    let image = png(100, 80);

    let first = body_json(send(router.clone(), detect_request(&image)).await).await;
    let second = body_json(send(router, detect_request(&image)).await).await;
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_do_not_mix() {
    let router = router_with(EchoDimensionsDetector);

    let handles: Vec<_> = (1..=8u32)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                let (width, height) = (10 * i, 7 * i);
                let response = send(router, detect_request(&png(width, height))).await;
                assert_eq!(response.status(), StatusCode::OK);
                (width, height, body_json(response).await)
            })
        })
        .collect();

    for handle in handles {
        let (width, height, body) = handle.await.unwrap();
        assert_eq!(
            body[0]["bbox"],
            serde_json::json!([0.0, 0.0, width as f32, height as f32])
        );
        assert_eq!(body[0]["class"], "person");
    }
}
