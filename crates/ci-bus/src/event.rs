// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Wire events carried on the bus.
//!
//! One variant per topic; `#[serde(tag = "type")]` keeps the encoded form
//! self-describing so a consumer reading raw bytes back off disk (or out
//! of a dead-letter dump) doesn't need the topic name alongside it.

use ci_core::{AgentName, AgentResultSummary, JobId, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CodeAnalysisRequested {
        job_id: JobId,
        repo_name: String,
        commit_hash: String,
        commit_message: String,
        diff: String,
        branch: String,
        author: String,
        timestamp: DateTime<Utc>,
    },
    AgentResult {
        job_id: JobId,
        agent_name: AgentName,
        verdict: Verdict,
        confidence: f64,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    ReleaseDecision {
        job_id: JobId,
        verdict: Verdict,
        score: f64,
        explanation: String,
        agent_results: Vec<AgentResultSummary>,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn job_id(&self) -> JobId {
        match self {
            Event::CodeAnalysisRequested { job_id, .. } => *job_id,
            Event::AgentResult { job_id, .. } => *job_id,
            Event::ReleaseDecision { job_id, .. } => *job_id,
        }
    }
}
