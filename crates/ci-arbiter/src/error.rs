// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the fan-in aggregator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArbiterError {
    #[error(transparent)]
    Bus(#[from] ci_bus::BusError),

    #[error(transparent)]
    Core(#[from] ci_core::CoreError),
}
