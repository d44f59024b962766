// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::DetectionResult;

/// One detected object as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRecord {
    /// [x1, y1, x2, y2] in pixels of the uploaded image
    pub bbox: [f32; 4],
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Human-readable class label
    #[serde(rename = "class")]
    pub class_name: String,
}

impl DetectionRecord {
    /// Convert a backend result, preserving emission order one-to-one
    pub fn from_result(result: &DetectionResult) -> Vec<Self> {
        result
            .detections
            .iter()
            .map(|det| Self {
                bbox: det.bbox,
                confidence: det.confidence,
                class_name: result.names.label(det.class_id),
            })
            .collect()
    }
}
