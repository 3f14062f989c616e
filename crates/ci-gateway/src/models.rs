// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Request/response bodies for the HTTP surface (§6).

use chrono::{DateTime, Utc};
use ci_core::{AgentResult, Job, JobId, JobStatus, ReleaseDecision, Verdict};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_name: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub diff: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub author: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AgentResultView {
    pub agent_name: String,
    pub verdict: Verdict,
    pub confidence: f64,
}

impl From<AgentResult> for AgentResultView {
    fn from(result: AgentResult) -> Self {
        Self { agent_name: result.agent_name.to_string(), verdict: result.verdict, confidence: result.confidence }
    }
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub decision: Option<Verdict>,
    pub explanation: Option<String>,
    pub agent_results: Vec<AgentResultView>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusResponse {
    pub fn from_parts(job: Job, agent_results: Vec<AgentResult>, decision: Option<ReleaseDecision>) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            decision: decision.as_ref().map(|d| d.verdict),
            explanation: decision.map(|d| d.explanation),
            agent_results: agent_results.into_iter().map(AgentResultView::from).collect(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub repo_name: String,
    pub commit_hash: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self { job_id: job.id, repo_name: job.repo_name, commit_hash: job.commit_hash, status: job.status, created_at: job.created_at }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsListResponse {
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub repo_name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
