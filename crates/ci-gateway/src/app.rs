// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Router assembly and shared application state.

use ci_bus::MessageBus;
use ci_config::Config;
use ci_core::metrics::Registry;
use ci_store::Store;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub bus: Arc<dyn MessageBus>,
    pub config: Arc<Config>,
    pub metrics: Registry,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/jobs/:job_id", get(handlers::get_job))
        .route("/api/v1/jobs", get(handlers::list_jobs))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
