// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::ImageError;

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    InvalidImage(String),
    PayloadTooLarge { limit: usize },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error, message) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone()),
            ApiError::InvalidImage(msg) => ("invalid_image", msg.clone()),
            ApiError::PayloadTooLarge { limit } => (
                "payload_too_large",
                format!("Uploaded file exceeds the limit of {} bytes", limit),
            ),
            ApiError::InternalError(msg) => ("internal_error", msg.clone()),
        };

        ErrorResponse {
            error: error.to_string(),
            message,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::PayloadTooLarge { limit } => {
                write!(f, "Payload too large (max: {} bytes)", limit)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::EmptyData => ApiError::InvalidRequest("Uploaded file is empty".to_string()),
            ImageError::TooLarge(_, limit) => ApiError::PayloadTooLarge { limit },
            ImageError::UnsupportedFormat => ApiError::InvalidImage(
                "Uploaded file is not a supported image format".to_string(),
            ),
            ImageError::DimensionsTooLarge(max, _) => ApiError::InvalidImage(format!(
                "Image dimensions exceed the {}x{} pixel limit",
                max, max
            )),
            ImageError::DecodeFailed(reason) => {
                ApiError::InvalidImage(format!("Could not decode uploaded image: {}", reason))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
