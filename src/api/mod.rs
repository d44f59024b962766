// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;

pub use detect::{detect_handler, DetectionRecord};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{root_handler, StatusResponse};
pub use http_server::{create_router, start_server, AppState, RequestLimits};
