// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 ONNX model wrapper

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{Array4, ArrayD};
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::labels::ClassNames;
use super::postprocessing::{output_class_count, postprocess, PostprocessParams};
use super::preprocessing::{preprocess, YOLO_INPUT_SIZE};
use super::{DetectionResult, ObjectDetector};

/// Metadata key the ultralytics exporter stores class names under
const NAMES_METADATA_KEY: &str = "names";

/// Configuration for loading a detection model
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the exported ONNX weights (e.g. yolov8n.onnx)
    pub model_path: PathBuf,
    /// Optional labels file overriding the names embedded in the model
    pub labels_path: Option<PathBuf>,
    /// Square model input size
    pub input_size: u32,
    /// Confidence / IoU / max detection settings
    pub postprocess: PostprocessParams,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("yolov8n.onnx"),
            labels_path: None,
            input_size: YOLO_INPUT_SIZE,
            postprocess: PostprocessParams::default(),
            intra_threads: 4,
        }
    }
}

/// YOLOv8 object detector
///
/// Loaded once at startup and shared across requests. ONNX Runtime needs
/// exclusive access to run a session, so inference calls are serialized
/// through the session mutex.
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class table used for labelling, one entry per model class
    names: Arc<ClassNames>,
    /// Classes predicted by the model, read from its output shape
    num_classes: usize,
    config: DetectorConfig,
    model_name: String,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("classes", &self.num_classes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model described by `config`
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The labels file cannot be read
    /// - The warm-up inference fails or its output is not a YOLOv8 head
    /// - The class table does not have one label per model class
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let mut session = build_session(model_path, config.intra_threads)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input {}: {:?}", input.name, input.input_type);
        }

        let names = match config.labels_path {
            Some(ref path) => {
                let names = ClassNames::from_file(path)?;
                info!("Loaded {} class labels from {}", names.len(), path.display());
                names
            }
            None => embedded_names(&session).unwrap_or_else(|| {
                warn!("Model has no class names metadata, using COCO labels");
                ClassNames::coco()
            }),
        };

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        let num_classes = warm_up(&mut session, &input_name, config.input_size)?;
        names.ensure_class_count(num_classes).with_context(|| {
            format!(
                "Class names do not match detection model {}",
                model_path.display()
            )
        })?;

        info!(
            "✅ Detection model {} loaded ({} classes, input {}x{})",
            model_name, num_classes, config.input_size, config.input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            names: Arc::new(names),
            num_classes,
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl ObjectDetector for YoloDetector {
    fn predict(&self, image: &RgbImage) -> Result<DetectionResult> {
        let start = Instant::now();

        let (input, letterbox) = preprocess(image, self.config.input_size);

        let output = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;
            run_session(&mut session, &self.input_name, input)?
        };

        let detections = postprocess(
            output.view(),
            &letterbox,
            &self.config.postprocess,
            self.num_classes,
        )?;

        Ok(DetectionResult {
            detections,
            names: self.names.clone(),
            inference_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn class_names(&self) -> Arc<ClassNames> {
        self.names.clone()
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }
}

/// Run the session on one `[1, 3, S, S]` input and copy out the first output
fn run_session(session: &mut Session, input_name: &str, input: Array4<f32>) -> Result<ArrayD<f32>> {
    let input_value = Tensor::from_array(input).context("Failed to create input tensor")?;

    let outputs = session
        .run(ort::inputs![input_name => input_value])
        .context("Detection inference failed")?;

    let output = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?
        .to_owned();
    Ok(output)
}

/// Run one inference on a blank frame so the first request does not pay
/// for lazy runtime initialization, and read the class count off the output
fn warm_up(session: &mut Session, input_name: &str, input_size: u32) -> Result<usize> {
    let start = Instant::now();
    let (input, _) = preprocess(&RgbImage::new(input_size, input_size), input_size);
    let output = run_session(session, input_name, input).context("Warm-up inference failed")?;
    let num_classes = output_class_count(output.shape(), input_size)?;

    debug!(
        "Warm-up inference took {}ms, output shape {:?}",
        start.elapsed().as_millis(),
        output.shape()
    );
    Ok(num_classes)
}

fn session_builder(intra_threads: usize) -> Result<SessionBuilder> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")
}

#[cfg(feature = "cuda")]
fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    info!("   Attempting CUDA execution provider...");
    let cuda_result = session_builder(intra_threads)?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("✅ CUDA execution provider initialized");
            Ok(session)
        }
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed: {}", e);
            warn!("   Falling back to CPU execution provider");
            build_cpu_session(model_path, intra_threads)
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    build_cpu_session(model_path, intra_threads)
}

fn build_cpu_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    session_builder(intra_threads)?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load detection model from {}",
            model_path.display()
        ))
}

/// Class names embedded by the exporter, if present and parseable
fn embedded_names(session: &Session) -> Option<ClassNames> {
    let metadata = match session.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Could not read model metadata: {}", e);
            return None;
        }
    };

    match metadata.custom(NAMES_METADATA_KEY) {
        Ok(Some(raw)) => {
            let names = ClassNames::from_metadata(&raw);
            if names.is_none() {
                warn!("Unparseable class names metadata: {}", raw);
            }
            names
        }
        Ok(None) => None,
        Err(e) => {
            debug!("Could not read class names metadata: {}", e);
            None
        }
    }
}
