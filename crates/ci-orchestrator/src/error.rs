// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Bus(#[from] ci_bus::BusError),

    #[error(transparent)]
    Store(#[from] ci_store::StoreError),

    #[error(transparent)]
    Core(#[from] ci_core::CoreError),
}
