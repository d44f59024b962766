// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 output decoding and non-maximum suppression

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix3};

use super::preprocessing::Letterbox;
use super::RawDetection;

/// Upper bound on boxes fed into NMS
const MAX_NMS_CANDIDATES: usize = 30_000;

/// Thresholds applied after inference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessParams {
    /// Minimum class score kept (0.0-1.0)
    pub conf_threshold: f32,
    /// IoU above which a lower-scored box of the same class is suppressed
    pub iou_threshold: f32,
    /// Maximum detections returned per image
    pub max_detections: usize,
}

impl Default for PostprocessParams {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Turn a raw `[1, 4 + nc, anchors]` output into final detections
///
/// `num_classes` fixes the layout: the axis of length `4 + num_classes`
/// holds box and score rows, the other one anchors. The transposed
/// `[1, anchors, 4 + nc]` export is accepted as well. Boxes are returned in
/// original image coordinates, ordered by descending confidence.
pub fn postprocess(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    params: &PostprocessParams,
    num_classes: usize,
) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|_| anyhow::anyhow!("Unexpected detection output shape: {:?}", shape))?;

    if shape[0] != 1 {
        anyhow::bail!("Expected batch size 1, got output shape {:?}", shape);
    }
    if num_classes == 0 {
        anyhow::bail!("Detection model has no classes");
    }

    let rows = 4 + num_classes;
    let predictions = output.index_axis_move(Axis(0), 0);
    let predictions = if predictions.nrows() == rows {
        predictions
    } else if predictions.ncols() == rows {
        predictions.reversed_axes()
    } else {
        anyhow::bail!(
            "Detection output shape {:?} does not match {} classes",
            shape,
            num_classes
        );
    };

    let candidates = decode_predictions(predictions, params.conf_threshold);
    let kept = non_max_suppression(candidates, params.iou_threshold, params.max_detections);

    Ok(kept
        .into_iter()
        .map(|det| RawDetection {
            bbox: letterbox.unmap_box(det.bbox),
            ..det
        })
        .collect())
}

/// Number of classes in an output of shape `[1, 4 + nc, anchors]` (or its
/// transpose) produced for a square input of `input_size` pixels
///
/// YOLOv8 heads predict one anchor per cell of the stride 8, 16 and 32
/// grids, which identifies the anchor axis regardless of how many classes
/// the model has.
pub fn output_class_count(shape: &[usize], input_size: u32) -> Result<usize> {
    let [1, a, b] = shape else {
        anyhow::bail!("Unexpected detection output shape: {:?}", shape);
    };

    let anchors = expected_anchors(input_size);
    let rows = if *b == anchors {
        *a
    } else if *a == anchors {
        *b
    } else {
        anyhow::bail!(
            "Detection output shape {:?} has no axis of {} anchors for input size {}",
            shape,
            anchors,
            input_size
        );
    };

    if rows <= 4 {
        anyhow::bail!("Detection output has no class scores: {:?}", shape);
    }
    Ok(rows - 4)
}

/// Anchor count of a YOLOv8 head for a square input of `input_size` pixels
pub fn expected_anchors(input_size: u32) -> usize {
    [8u32, 16, 32]
        .iter()
        .map(|stride| {
            let cells = (input_size / stride) as usize;
            cells * cells
        })
        .sum()
}

/// Decode `[4 + nc, anchors]` predictions into candidate boxes
///
/// Each anchor keeps its best-scoring class if that score reaches
/// `conf_threshold`. Boxes stay in model input space, converted from
/// centre/size to corners.
pub fn decode_predictions(predictions: ArrayView2<f32>, conf_threshold: f32) -> Vec<RawDetection> {
    let num_classes = predictions.nrows() - 4;
    let mut candidates = Vec::new();

    for anchor in predictions.axis_iter(Axis(1)) {
        let (class_id, score) = anchor
            .iter()
            .skip(4)
            .take(num_classes)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        if !(score >= conf_threshold) {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        candidates.push(RawDetection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence: score.clamp(0.0, 1.0),
            class_id,
        });
    }

    candidates
}

/// Greedy class-aware non-maximum suppression
///
/// Candidates are ranked by descending confidence (stable for ties); a box
/// is dropped when it overlaps an already kept box of the same class by
/// more than `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(MAX_NMS_CANDIDATES);

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}
