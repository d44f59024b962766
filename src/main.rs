// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use recircle_od::{
    api::{start_server, AppState},
    config::ServerConfig,
    version,
    vision::{ObjectDetector, YoloDetector},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    config.validate().context("Invalid configuration")?;

    info!("Starting {}", version::get_version_string());
    info!("Build: {}", version::VERSION);

    let detector_config = config.detector_config();
    let model_path = detector_config.model_path.clone();
    // Blocks until the session is built and warmed up
    let detector = tokio::task::spawn_blocking(move || YoloDetector::new(detector_config))
        .await
        .context("Model loading task panicked")?
        .with_context(|| format!("Failed to load detection model {}", model_path.display()))?;

    info!(
        "Loaded {} with {} classes",
        detector.model_name(),
        detector.num_classes()
    );

    let limits = config.request_limits();
    info!(
        "Limits: upload {} bytes, timeout {:?}, {} concurrent inferences",
        limits.max_upload_bytes, limits.request_timeout, limits.max_concurrent_inferences
    );

    let state = AppState::new(Arc::new(detector), limits);
    start_server(config.listen_addr(), state).await
}
