// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Error types for the message bus.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("consumer group {group:?} already exists on topic {topic}")]
    GroupAlreadyExists { topic: &'static str, group: String },

    #[error("consumer group {group:?} not found on topic {topic}")]
    UnknownGroup { topic: &'static str, group: String },

    #[error("message {0} not found or not pending for this consumer")]
    MessageNotPending(String),
}
