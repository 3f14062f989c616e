// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Top-level error type for the operator binary. Every variant is a
//! startup-time failure; once a component's `run()` loop is underway it
//! never returns an `Err` (§7: handlers log and leave messages unacked
//! rather than propagating).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ci_config::ConfigError),

    #[error(transparent)]
    Store(#[from] ci_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown analyzer agent {0:?} (expected one of: diff, intent, security, performance, test)")]
    UnknownAgent(String),

    #[error("background task panicked: {0}")]
    JoinFailed(#[from] tokio::task::JoinError),
}
