// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::RequestLimits;
use crate::vision::{DetectorConfig, PostprocessParams, DEFAULT_MAX_IMAGE_SIZE};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },

    #[error("input size must be a multiple of 32, got {0}")]
    InputSizeNotAligned(u32),
}

/// Recircle object detection service
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Path to the exported YOLOv8 ONNX weights
    #[arg(long, env = "MODEL_PATH", default_value = "yolov8n.onnx", value_name = "FILE")]
    pub model: PathBuf,

    /// Labels file (one class name per line), overrides names embedded in the model
    #[arg(long, env = "LABELS_PATH", value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Square model input size in pixels
    #[arg(long, env = "INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    /// Confidence threshold (0.0 - 1.0)
    #[arg(long, env = "CONF_THRESHOLD", default_value_t = 0.25, value_name = "THRESHOLD")]
    pub conf_threshold: f32,

    /// NMS IoU threshold (0.0 - 1.0)
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.7, value_name = "THRESHOLD")]
    pub iou_threshold: f32,

    /// Maximum detections per image
    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Inference calls admitted concurrently (defaults to the number of CPUs)
    #[arg(long, env = "MAX_CONCURRENT_INFERENCES")]
    pub max_concurrent_inferences: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("conf_threshold", self.conf_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        if self.input_size == 0 {
            return Err(ConfigError::Zero { name: "input_size" });
        }
        if self.input_size % 32 != 0 {
            return Err(ConfigError::InputSizeNotAligned(self.input_size));
        }

        let counts = [
            ("max_detections", self.max_detections),
            ("intra_threads", self.intra_threads),
            ("max_upload_bytes", self.max_upload_bytes),
            ("request_timeout_secs", self.request_timeout_secs as usize),
            (
                "max_concurrent_inferences",
                self.max_concurrent_inferences.unwrap_or(1),
            ),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            model_path: self.model.clone(),
            labels_path: self.labels.clone(),
            input_size: self.input_size,
            postprocess: PostprocessParams {
                conf_threshold: self.conf_threshold,
                iou_threshold: self.iou_threshold,
                max_detections: self.max_detections,
            },
            intra_threads: self.intra_threads,
        }
    }

    pub fn request_limits(&self) -> RequestLimits {
        let defaults = RequestLimits::default();
        RequestLimits {
            max_upload_bytes: self.max_upload_bytes,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_concurrent_inferences: self
                .max_concurrent_inferences
                .unwrap_or(defaults.max_concurrent_inferences),
        }
    }
}
