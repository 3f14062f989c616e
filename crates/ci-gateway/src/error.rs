// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the gateway, and their mapping onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing signature headers")]
    MissingSignature,

    #[error("request timestamp is outside the acceptance window")]
    StaleTimestamp,

    #[error("request signature does not match")]
    BadSignature,

    #[error("malformed request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Store(#[from] ci_store::StoreError),

    #[error(transparent)]
    Bus(#[from] ci_bus::BusError),

    #[error("job {0} not found")]
    JobNotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::MissingSignature | GatewayError::StaleTimestamp | GatewayError::BadSignature => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::JobNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_) | GatewayError::Bus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { error: self.to_string() };
        (status, axum::Json(body)).into_response()
    }
}
