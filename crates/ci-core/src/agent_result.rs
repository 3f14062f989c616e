// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Analyzer verdicts and the results they produce.

use crate::error::CoreError;
use crate::job::JobId;
use crate::simple_display;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Name of an analyzer ("diff", "intent", "security", "performance", "test").
///
/// A plain `SmolStr` rather than a closed enum: the analyzer roster is
/// config-driven (§3 of the weights table), and new analyzers shouldn't
/// require a core-crate release to add.
pub type AgentName = SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Warn,
    Reject,
    Skip,
}

simple_display! {
    Verdict {
        Approve => "approve",
        Warn => "warn",
        Reject => "reject",
        Skip => "skip",
    }
}

impl Verdict {
    /// Base score used by the weighted-voting rule, before confidence and
    /// per-agent weight are applied. `Skip` counts as a neutral abstention,
    /// the same weight as `Warn`, so a skipped analyzer neither helps nor
    /// hurts the outcome.
    pub fn base_score(self) -> f64 {
        match self {
            Verdict::Approve => 1.0,
            Verdict::Warn => 0.5,
            Verdict::Reject => 0.0,
            Verdict::Skip => 0.5,
        }
    }
}

/// One analyzer's finding for a single job.
///
/// Uniquely keyed by `(job_id, agent_name)`; re-publishing a result for the
/// same key is an idempotent upsert, not a duplicate (invariant I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub job_id: JobId,
    pub agent_name: AgentName,
    pub verdict: Verdict,
    /// Clamped to `[0.0, 1.0]` on construction (invariant I5).
    pub confidence: f64,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AgentResult {
    pub fn new(
        job_id: JobId,
        agent_name: impl Into<AgentName>,
        verdict: Verdict,
        confidence: f64,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(CoreError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            job_id,
            agent_name: agent_name.into(),
            verdict,
            confidence,
            payload,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        approve = { Verdict::Approve, 1.0 },
        warn = { Verdict::Warn, 0.5 },
        reject = { Verdict::Reject, 0.0 },
        skip = { Verdict::Skip, 0.5 },
    )]
    fn base_scores(verdict: Verdict, expected: f64) {
        assert_eq!(verdict.base_score(), expected);
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let err = AgentResult::new(
            JobId::new(),
            "diff",
            Verdict::Approve,
            1.5,
            serde_json::json!({}),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ConfidenceOutOfRange(_)));
    }

    #[test]
    fn confidence_in_range_is_accepted() {
        let result = AgentResult::new(
            JobId::new(),
            "security",
            Verdict::Reject,
            0.9,
            serde_json::json!({"findings": 3}),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(result.confidence, 0.9);
    }
}
