// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Shared error vocabulary for domain-level invariant violations.
//!
//! Crate-specific errors (`BusError`, `StoreError`, ...) wrap or convert
//! from this where a violation originates in the domain model itself
//! rather than in I/O or wire handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid job status transition: {from} -> {to}")]
    InvalidStatusTransition { from: &'static str, to: &'static str },

    #[error("confidence {0} out of range [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),

    #[error("invalid id: {0:?}")]
    InvalidId(String),
}
