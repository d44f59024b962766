// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::response::DetectionRecord;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::image_utils::format_to_extension;
use crate::vision::{decode_image_bytes, ObjectDetector};

/// Multipart field carrying the encoded image
pub const UPLOAD_FIELD: &str = "file";

/// Message returned for backend failures; details only go to the log
const DETECTION_FAILED: &str = "Object detection failed";

/// POST /detect/ - Detect objects in an uploaded image
///
/// Accepts a `multipart/form-data` body whose `file` field holds the raw
/// bytes of an encoded image (PNG, JPEG, WebP, GIF, BMP, TIFF, ...).
///
/// # Response
/// A JSON array with one entry per detected object, in the order the model
/// emitted them:
/// - `bbox`: `[x1, y1, x2, y2]` in pixels of the uploaded image
/// - `confidence`: score in 0.0-1.0
/// - `class`: class label
///
/// # Errors
/// - 400 Bad Request: missing `file` field, empty upload, undecodable image
/// - 413 Payload Too Large: upload exceeds the configured limit
/// - 500 Internal Server Error: inference failed
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Rejected detect request: {}", rejection);
        ApiError::InvalidRequest(rejection.to_string())
    })?;

    // 1. Read the uploaded file into memory
    let bytes = read_upload(&mut multipart, state.limits.max_upload_bytes).await?;

    // 2. Wait for an inference slot
    let permit = state
        .inference_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| {
            error!("Inference permits unavailable: {}", e);
            ApiError::InternalError(DETECTION_FAILED.to_string())
        })?;

    // 3. Decode and run inference off the async runtime
    let detector = state.detector.clone();
    let max_upload_bytes = state.limits.max_upload_bytes;
    let records = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        detect_bytes(detector.as_ref(), &bytes, max_upload_bytes)
    })
    .await
    .map_err(|e| {
        error!("Detection task failed: {}", e);
        ApiError::InternalError(DETECTION_FAILED.to_string())
    })??;

    Ok(Json(records))
}

/// Decode `bytes` and run them through `detector`
///
/// This is the whole request pipeline minus HTTP; the result is a one-to-one
/// conversion of what the detector emitted.
pub fn detect_bytes(
    detector: &dyn ObjectDetector,
    bytes: &[u8],
    max_upload_bytes: usize,
) -> Result<Vec<DetectionRecord>, ApiError> {
    let (image, info) = decode_image_bytes(bytes, max_upload_bytes).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::from(e)
    })?;

    debug!(
        "Decoded image: {}x{} {}, {} bytes",
        info.width,
        info.height,
        format_to_extension(info.format),
        info.size_bytes
    );

    let result = detector.predict(&image).map_err(|e| {
        error!("Detection with {} failed: {:#}", detector.model_name(), e);
        ApiError::InternalError(DETECTION_FAILED.to_string())
    })?;

    let records = DetectionRecord::from_result(&result);

    info!(
        "Detection complete: {} objects, {}ms",
        records.len(),
        result.inference_time_ms
    );
    debug!("Detections: {:?}", records);

    Ok(records)
}

/// Pull the bytes of the `file` field out of the multipart body
async fn read_upload(multipart: &mut Multipart, max_upload_bytes: usize) -> Result<Bytes, ApiError> {
    let multipart_error = |e: MultipartError| {
        warn!("Malformed multipart body: {}", e);
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: max_upload_bytes,
            }
        } else {
            ApiError::InvalidRequest(format!("Malformed multipart body: {}", e.body_text()))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        debug!(
            "Received upload {:?}: {} bytes",
            file_name.as_deref().unwrap_or("<unnamed>"),
            bytes.len()
        );
        return Ok(bytes);
    }

    Err(ApiError::InvalidRequest(format!(
        "Missing '{}' field in multipart body",
        UPLOAD_FIELD
    )))
}
