// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The fan-in aggregator (§2's AR): accumulates `agent_results` per job,
//! applies the weighted-voting rule under a wait-deadline policy, and
//! publishes exactly one `release_decisions` record per job.

mod error;
mod explain;
mod score;
mod service;
mod weights;

pub use error::ArbiterError;
pub use explain::{blocking_issues, render_explanation};
pub use score::{final_verdict, weighted_score};
pub use service::{ArbiterConfig, ArbiterService, CONSUMER_GROUP};
pub use weights::AgentWeights;
