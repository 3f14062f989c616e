// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the relational store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),

    #[error("store db error: {0}")]
    Db(String),

    #[error("store row is corrupt: {0}")]
    Corrupt(String),

    #[error("a release decision already exists for job {0}")]
    DecisionAlreadyExists(String),

    #[error("job {0} not found")]
    JobNotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Db(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
