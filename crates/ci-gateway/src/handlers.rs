// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Route handlers (§4.3, §6).

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use ci_bus::{Event, Topic};
use ci_core::{Job, JobId, SystemClock};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::error::GatewayError;
use crate::models::{
    AnalyzeRequest, AnalyzeResponse, HealthResponse, JobStatusResponse, JobSummary, JobsListResponse, ListJobsQuery,
};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", service: "ci-gateway" })
}

pub async fn metrics(State(state): State<AppState>) -> Json<ci_core::metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Create-job protocol (§4.3): persist in ST, then publish, then respond.
/// If step 2 fails the job is left `pending` — `job_id` stability lets a
/// recovery sweep re-publish later without creating a duplicate job.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<AnalyzeResponse>, GatewayError> {
    auth::verify(
        &state.config.hmac_secret_key,
        header_str(&headers, TIMESTAMP_HEADER),
        header_str(&headers, SIGNATURE_HEADER),
        &body,
        state.config.request_signature_window(),
    )?;

    let request: AnalyzeRequest =
        serde_json::from_slice(&body).map_err(|err| GatewayError::InvalidBody(err.to_string()))?;

    if state.config.dedupe_by_commit {
        if let Some(existing) = state.store.find_job_by_commit(&request.repo_name, &request.commit_hash).await? {
            info!(job_id = %existing.id, "reusing existing job for commit (dedupe_by_commit)");
            return Ok(Json(AnalyzeResponse { job_id: existing.id, status: existing.status, created_at: existing.created_at }));
        }
    }

    let job = Job::new(
        &SystemClock,
        request.repo_name.clone(),
        request.commit_hash.clone(),
        request.commit_message.clone(),
        request.branch.clone(),
        request.author.clone(),
    );

    state.store.create_job(&job).await?;

    let event = Event::CodeAnalysisRequested {
        job_id: job.id,
        repo_name: request.repo_name,
        commit_hash: request.commit_hash,
        commit_message: request.commit_message,
        diff: request.diff,
        branch: request.branch,
        author: request.author,
        timestamp: job.created_at,
    };

    if let Err(err) = state.bus.publish(Topic::CodeAnalysisRequested, event).await {
        // The job is already durable in ST; leave it pending rather than
        // surfacing a 5xx for a step that a recovery sweep can retry later.
        warn!(job_id = %job.id, error = %err, "failed to publish code_analysis_requested, job remains pending");
    } else {
        state.metrics.incr("jobs_created_total", 1);
    }

    Ok(Json(AnalyzeResponse { job_id: job.id, status: job.status, created_at: job.created_at }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, GatewayError> {
    let job_id = JobId::from_string(job_id);
    let job = state.store.get_job(&job_id).await?.ok_or_else(|| GatewayError::JobNotFound(job_id.to_string()))?;
    let agent_results = state.store.list_agent_results(&job_id).await?;
    let decision = state.store.get_decision(&job_id).await?;
    Ok(Json(JobStatusResponse::from_parts(job, agent_results, decision)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobsListResponse>, GatewayError> {
    let jobs = state.store.list_jobs(query.repo_name.as_deref(), query.limit).await?;
    Ok(Json(JobsListResponse { jobs: jobs.into_iter().map(JobSummary::from).collect() }))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
