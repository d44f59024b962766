// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing: image decoding and object detection
//!
//! This module provides:
//! - Decoding of uploaded image bytes into RGB buffers
//! - YOLOv8 object detection via ONNX Runtime

pub mod detection;
pub mod image_utils;

pub use detection::{
    ClassNames, DetectionResult, DetectorConfig, ObjectDetector, PostprocessParams, RawDetection,
    YoloDetector,
};
pub use image_utils::{
    decode_image_bytes, ImageError, ImageInfo, DEFAULT_MAX_IMAGE_SIZE, MAX_IMAGE_DIMENSION,
};
