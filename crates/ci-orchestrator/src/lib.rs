// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! ci-orchestrator: the component that mirrors `agent_results` and
//! `release_decisions` bus events into [`ci_store::Store`] and advances
//! the job state machine (§2's OR, §4.6).

mod error;
mod service;

pub use error::OrchestratorError;
pub use service::{OrchestratorConfig, OrchestratorService, CONSUMER_GROUP};
