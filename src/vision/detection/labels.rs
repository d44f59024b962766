// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class name tables for detection models

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

/// COCO dataset class names, the label set yolov8n is trained on
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Mapping from class index to human-readable label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Parse the `names` metadata entry written by the ultralytics exporter
    ///
    /// The value is a Python dict literal such as
    /// `{0: 'person', 1: 'bicycle', 2: 'car'}`. Indices missing from the
    /// literal are filled with `class_<id>`. Returns `None` when nothing
    /// could be parsed.
    pub fn from_metadata(value: &str) -> Option<Self> {
        let entry = Regex::new(r#"(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#)
            .ok()?;

        let mut by_index = BTreeMap::new();
        for caps in entry.captures_iter(value) {
            let Ok(index) = caps[1].parse::<usize>() else {
                continue;
            };
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().replace("\\'", "'").replace("\\\"", "\""))
                .unwrap_or_default();
            by_index.insert(index, name);
        }

        let last = *by_index.keys().next_back()?;
        let names = (0..=last)
            .map(|i| by_index.remove(&i).unwrap_or_else(|| fallback_label(i)))
            .collect();

        Some(Self::new(names))
    }

    /// Load one label per line; line `i` names class `i`
    ///
    /// Trailing blank lines are ignored. A blank line anywhere else is an
    /// error since it would shift every later class index.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels file {}", path.display()))?;

        let mut names: Vec<String> = contents.lines().map(|l| l.trim().to_string()).collect();
        while names.last().is_some_and(|l| l.is_empty()) {
            names.pop();
        }

        if names.is_empty() {
            anyhow::bail!("Labels file {} contains no labels", path.display());
        }
        if let Some(line) = names.iter().position(String::is_empty) {
            anyhow::bail!(
                "Labels file {} has a blank label on line {}",
                path.display(),
                line + 1
            );
        }

        Ok(Self::new(names))
    }

    /// Fail unless there is exactly one label per model class
    pub fn ensure_class_count(&self, num_classes: usize) -> Result<()> {
        if self.len() != num_classes {
            anyhow::bail!(
                "Class table has {} labels but the model predicts {} classes",
                self.len(),
                num_classes
            );
        }
        Ok(())
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Label for `class_id`, or `class_<id>` when the table has no entry
    pub fn label(&self, class_id: usize) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| fallback_label(class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.names.iter().any(|n| n == label)
    }
}

fn fallback_label(class_id: usize) -> String {
    format!("class_{}", class_id)
}
