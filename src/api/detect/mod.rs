// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /detect/ for detecting objects in uploaded images.

pub mod handler;
pub mod response;

pub use handler::{detect_bytes, detect_handler, UPLOAD_FIELD};
pub use response::DetectionRecord;
