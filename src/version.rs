// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Recircle object detection service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-yolov8-onnx-2025-10-17";

/// Build date
pub const BUILD_DATE: &str = "2025-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolov8-onnx",
    "multipart-upload",
    "class-aware-nms",
    "embedded-class-names",
    "labels-file",
    "permissive-cors",
    "inference-admission-control",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Recircle OD {} ({})", VERSION_NUMBER, BUILD_DATE)
}
