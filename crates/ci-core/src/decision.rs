// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The arbiter's final, published output for a job.

use crate::agent_result::{AgentName, Verdict};
use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single agent's contribution to a decision, as recorded alongside it.
///
/// Denormalized copy of the inputs the arbiter saw, independent of whatever
/// `agent_results` rows exist by the time someone reads the decision back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultSummary {
    pub agent_name: AgentName,
    pub verdict: Verdict,
    pub confidence: f64,
}

/// The arbiter's weighted-vote outcome for one job.
///
/// At most one decision exists per `job_id` (invariant I3) — both the
/// arbiter's in-process guard and the store's unique constraint enforce
/// this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDecision {
    pub job_id: JobId,
    pub verdict: Verdict,
    pub score: f64,
    pub explanation: String,
    pub agent_results: Vec<AgentResultSummary>,
    pub created_at: DateTime<Utc>,
}
