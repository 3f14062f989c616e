// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The job record and its state machine.
//!
//! A job moves `Pending -> Processing -> Completed`, with `Failed` reachable
//! from any non-terminal state. Once `Completed` or `Failed`, a job never
//! regresses (invariant I2) — [`JobStatus::can_transition_to`] is the single
//! place that rule is enforced.

use crate::clock::Clock;
use crate::define_id;
use crate::error::CoreError;
use crate::simple_display;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_id! {
    /// Identifies one release-evaluation job, from gateway intake through
    /// final decision.
    pub struct JobId("job-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

simple_display! {
    JobStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl JobStatus {
    /// Whether moving from `self` to `next` is a legal state transition.
    ///
    /// Terminal states (`Completed`, `Failed`) never transition further;
    /// `Failed` is reachable from `Pending` or `Processing` but not from
    /// `Completed` (a completed job cannot later fail).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A release-evaluation job: one (repo, commit) pair submitted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub repo_name: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub branch: String,
    pub author: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        clock: &impl Clock,
        repo_name: impl Into<String>,
        commit_hash: impl Into<String>,
        commit_message: impl Into<String>,
        branch: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            repo_name: repo_name.into(),
            commit_hash: commit_hash.into(),
            commit_message: commit_message.into(),
            branch: branch.into(),
            author: author.into(),
            status: JobStatus::Pending,
            created_at: clock.utc_now(),
            completed_at: None,
        }
    }

    /// Attempt to move the job to `next`, validating the transition.
    pub fn transition(&mut self, clock: &impl Clock, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidStatusTransition {
                from: status_str(self.status),
                to: status_str(next),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(clock.utc_now());
        }
        Ok(())
    }
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}
