// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::Json;
use serde::{Deserialize, Serialize};

/// Fixed liveness payload
pub const RUNNING_STATUS: &str = "Backend running";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn running() -> Self {
        Self {
            status: RUNNING_STATUS.to_string(),
        }
    }
}

/// GET / - Liveness check
pub async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse::running())
}
