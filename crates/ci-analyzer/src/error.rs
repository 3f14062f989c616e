// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the analyzer framework.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analyzer {0:?} timed out")]
    Timeout(String),

    #[error("analyzer {agent:?} failed: {reason}")]
    Failed { agent: String, reason: String },

    #[error(transparent)]
    Bus(#[from] ci_bus::BusError),

    #[error(transparent)]
    Core(#[from] ci_core::CoreError),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no LLM provider configured")]
    Unavailable,

    #[error("LLM call failed: {0}")]
    CallFailed(String),
}
