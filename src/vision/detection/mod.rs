// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection
//!
//! Components:
//! - `preprocessing` - Letterbox resize and tensor conversion
//! - `postprocessing` - Output decoding and non-maximum suppression
//! - `labels` - Class index to name mapping
//! - `model` - ONNX Runtime session wrapper

pub mod labels;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;

use std::sync::Arc;

use image::RgbImage;

pub use labels::{ClassNames, COCO_CLASSES};
pub use model::{DetectorConfig, YoloDetector};
pub use postprocessing::PostprocessParams;
pub use preprocessing::Letterbox;

/// A single detection as emitted by the model
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// [x_min, y_min, x_max, y_max] in original image pixels
    pub bbox: [f32; 4],
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Index into the model's class table
    pub class_id: usize,
}

impl RawDetection {
    pub fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
    }

    pub fn iou(&self, other: &RawDetection) -> f32 {
        let x1 = self.bbox[0].max(other.bbox[0]);
        let y1 = self.bbox[1].max(other.bbox[1]);
        let x2 = self.bbox[2].min(other.bbox[2]);
        let y2 = self.bbox[3].min(other.bbox[3]);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Output of one single-image inference call
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Detections in model emission order
    pub detections: Vec<RawDetection>,
    /// Class table the `class_id`s index into
    pub names: Arc<ClassNames>,
    /// Inference time in milliseconds
    pub inference_time_ms: u64,
}

/// A loaded object-detection model
///
/// Implementations are shared read-only across concurrent requests and must
/// serialize any internal state that cannot be used concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Run inference on one decoded RGB image
    fn predict(&self, image: &RgbImage) -> anyhow::Result<DetectionResult>;

    /// Class table used to label detections
    fn class_names(&self) -> Arc<ClassNames>;

    /// Model name for logging
    fn model_name(&self) -> String;
}
