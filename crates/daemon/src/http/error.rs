// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-to-status mapping for the control plane.

use crate::router::RouterError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({"error": self.message()}))).into_response()
    }
}

impl From<RouterError> for ApiError {
    fn from(error: RouterError) -> Self {
        let message = error.to_string();
        match error {
            RouterError::UnknownWorkflow(_)
            | RouterError::UnknownRun(_)
            | RouterError::UnknownCheckpoint(_) => ApiError::NotFound(message),
            RouterError::InvalidInput { .. } | RouterError::InvalidCheckpointValue { .. } => {
                ApiError::BadRequest(message)
            }
            RouterError::AlreadyTerminal(_) | RouterError::NoCheckpointFound(_) => {
                ApiError::Conflict(message)
            }
        }
    }
}
