// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use super::detect::detect_handler;
use super::handlers::root_handler;
use crate::vision::{ObjectDetector, DEFAULT_MAX_IMAGE_SIZE};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Per-request resource limits
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    /// Largest accepted image upload in bytes
    pub max_upload_bytes: usize,
    /// Requests taking longer than this are answered with 408
    pub request_timeout: Duration,
    /// Inference calls admitted at the same time
    pub max_concurrent_inferences: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_IMAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            max_concurrent_inferences: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Detection model, loaded once at startup
    pub detector: Arc<dyn ObjectDetector>,
    /// Admission control for inference calls
    pub inference_permits: Arc<Semaphore>,
    pub limits: RequestLimits,
}

impl AppState {
    pub fn new(detector: Arc<dyn ObjectDetector>, limits: RequestLimits) -> Self {
        Self {
            detector,
            inference_permits: Arc::new(Semaphore::new(limits.max_concurrent_inferences.max(1))),
            limits,
        }
    }
}

/// Permissive CORS: any origin with credentials, any method, any header
///
/// Browsers reject `*` together with credentials, so the request's origin,
/// method and headers are mirrored back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.limits.max_upload_bytes + MULTIPART_OVERHEAD;
    let request_timeout = state.limits.request_timeout;

    Router::new()
        // Liveness check
        .route("/", get(root_handler))
        // Detection endpoint
        .route("/detect/", post(detect_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C or SIGTERM
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let model_name = state.detector.model_name();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "API server listening on {} (model: {})",
        listener.local_addr()?,
        model_name
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
