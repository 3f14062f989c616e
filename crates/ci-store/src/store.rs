// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The [`Store`] trait and its SQLite-backed implementation.
//!
//! Every method is `async` so the gateway, orchestrator, and analyzer
//! workers can await a store call alongside bus I/O without blocking the
//! executor; under the hood each call hands a blocking rusqlite operation
//! to [`tokio::task::spawn_blocking`] and borrows a connection from the
//! pool for the duration of that task.

use crate::error::StoreError;
use crate::pool::SqlitePool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ci_core::{AgentName, AgentResult, AgentResultSummary, Job, JobId, JobStatus, ReleaseDecision, Verdict};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a brand-new job. Called by the gateway before it publishes
    /// the `code_analysis_requested` event (invariant I6).
    async fn create_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Look up an existing job by `(repo_name, commit_hash)`, for the
    /// optional commit-level dedup path (§9 Open Question 2).
    async fn find_job_by_commit(
        &self,
        repo_name: &str,
        commit_hash: &str,
    ) -> Result<Option<Job>, StoreError>;

    /// Newest-first job summaries, optionally filtered by `repo_name`.
    async fn list_jobs(&self, repo_name: Option<&str>, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Move a job from `pending` to `processing`. A no-op (not an error) if
    /// the job is already `processing` or `completed` — the orchestrator
    /// calls this on every `agent_results` event it sees, which for a given
    /// job is every message after the first.
    async fn mark_processing(&self, id: &JobId) -> Result<(), StoreError>;

    /// Move a job to `completed`, stamping `completed_at`.
    async fn mark_completed(&self, id: &JobId, completed_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Upsert on `(job_id, agent_name)`: the bus's at-least-once delivery
    /// means the same result can arrive twice, and the second arrival must
    /// overwrite rather than duplicate (invariant behind scenario 6 of the
    /// distilled spec's testable properties).
    async fn upsert_agent_result(&self, result: &AgentResult) -> Result<(), StoreError>;

    async fn list_agent_results(&self, job_id: &JobId) -> Result<Vec<AgentResult>, StoreError>;

    /// Insert a decision, rejecting a second one for the same `job_id` via
    /// the `release_decisions.job_id` unique constraint. Returns `true` if
    /// this call actually inserted the row, `false` if one already existed
    /// (the duplicate-decision defense described in §9).
    async fn insert_decision(&self, decision: &ReleaseDecision) -> Result<bool, StoreError>;

    async fn get_decision(&self, job_id: &JobId) -> Result<Option<ReleaseDecision>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let connection = pool.get()?;
            f(&connection)
        })
        .await
        .map_err(|err| StoreError::Io(format!("blocking task panicked: {err}")))?
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        let job = job.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO jobs (id, repo_name, commit_hash, commit_message, branch, author, status, created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    job.id.as_str(),
                    job.repo_name,
                    job.commit_hash,
                    job.commit_message,
                    job.branch,
                    job.author,
                    job.status.to_string(),
                    job.created_at.to_rfc3339(),
                    job.completed_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let id = id.as_str().to_string();
        self.with_connection(move |conn| {
            conn.query_row("SELECT * FROM jobs WHERE id = ?1", params![id], row_to_job)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_job_by_commit(
        &self,
        repo_name: &str,
        commit_hash: &str,
    ) -> Result<Option<Job>, StoreError> {
        let repo_name = repo_name.to_string();
        let commit_hash = commit_hash.to_string();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT * FROM jobs WHERE repo_name = ?1 AND commit_hash = ?2 ORDER BY created_at DESC LIMIT 1",
                params![repo_name, commit_hash],
                row_to_job,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_jobs(&self, repo_name: Option<&str>, limit: usize) -> Result<Vec<Job>, StoreError> {
        let repo_name = repo_name.map(str::to_string);
        self.with_connection(move |conn| {
            let mut stmt = match &repo_name {
                Some(_) => conn.prepare(
                    "SELECT * FROM jobs WHERE repo_name = ?1 ORDER BY created_at DESC LIMIT ?2",
                )?,
                None => conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?1")?,
            };
            let rows = match &repo_name {
                Some(repo) => stmt.query_map(params![repo, limit as i64], row_to_job)?,
                None => stmt.query_map(params![limit as i64], row_to_job)?,
            };
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
        .await
    }

    async fn mark_processing(&self, id: &JobId) -> Result<(), StoreError> {
        let id = id.as_str().to_string();
        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE jobs SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![JobStatus::Processing.to_string(), id, JobStatus::Pending.to_string()],
            )?;
            if updated == 0 {
                ensure_job_exists(conn, &id)?;
            }
            Ok(())
        })
        .await
    }

    async fn mark_completed(&self, id: &JobId, completed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let id = id.as_str().to_string();
        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE jobs SET status = ?1, completed_at = ?2 WHERE id = ?3 AND status != ?1",
                params![JobStatus::Completed.to_string(), completed_at.to_rfc3339(), id],
            )?;
            if updated == 0 {
                ensure_job_exists(conn, &id)?;
            }
            Ok(())
        })
        .await
    }

    async fn upsert_agent_result(&self, result: &AgentResult) -> Result<(), StoreError> {
        let result = result.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO agent_results (job_id, agent_name, verdict, confidence, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(job_id, agent_name) DO UPDATE SET
                    verdict = excluded.verdict,
                    confidence = excluded.confidence,
                    payload = excluded.payload,
                    created_at = excluded.created_at",
                params![
                    result.job_id.as_str(),
                    result.agent_name.as_str(),
                    result.verdict.to_string(),
                    result.confidence,
                    result.payload.to_string(),
                    result.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_agent_results(&self, job_id: &JobId) -> Result<Vec<AgentResult>, StoreError> {
        let job_id = job_id.as_str().to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT job_id, agent_name, verdict, confidence, payload, created_at
                 FROM agent_results WHERE job_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![job_id], row_to_agent_result)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
        .await
    }

    async fn insert_decision(&self, decision: &ReleaseDecision) -> Result<bool, StoreError> {
        let decision = decision.clone();
        self.with_connection(move |conn| {
            let summary = serde_json::to_string(&decision.agent_results)
                .map_err(|err| StoreError::Corrupt(err.to_string()))?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO release_decisions (job_id, verdict, score, explanation, agent_results, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    decision.job_id.as_str(),
                    decision.verdict.to_string(),
                    decision.score,
                    decision.explanation,
                    summary,
                    decision.created_at.to_rfc3339(),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn get_decision(&self, job_id: &JobId) -> Result<Option<ReleaseDecision>, StoreError> {
        let job_id = job_id.as_str().to_string();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT job_id, verdict, score, explanation, agent_results, created_at
                 FROM release_decisions WHERE job_id = ?1",
                params![job_id],
                row_to_decision,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }
}

fn ensure_job_exists(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let exists: bool =
        conn.query_row("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = ?1)", params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::JobNotFound(id.to_string()))
    }
}

fn parse_verdict(raw: &str) -> rusqlite::Result<Verdict> {
    match raw {
        "approve" => Ok(Verdict::Approve),
        "warn" => Ok(Verdict::Warn),
        "reject" => Ok(Verdict::Reject),
        "skip" => Ok(Verdict::Skip),
        other => Err(corrupt_row(format!("unknown verdict {other:?}"))),
    }
}

fn parse_status(raw: &str) -> rusqlite::Result<JobStatus> {
    match raw {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(corrupt_row(format!("unknown status {other:?}"))),
    }
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|err| corrupt_row(err.to_string()))
}

fn corrupt_row(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: JobId::from_string(row.get::<_, String>("id")?),
        repo_name: row.get("repo_name")?,
        commit_hash: row.get("commit_hash")?,
        commit_message: row.get("commit_message")?,
        branch: row.get("branch")?,
        author: row.get("author")?,
        status: parse_status(&row.get::<_, String>("status")?)?,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
        completed_at: row
            .get::<_, Option<String>>("completed_at")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

fn row_to_agent_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentResult> {
    let payload_raw: String = row.get("payload")?;
    Ok(AgentResult {
        job_id: JobId::from_string(row.get::<_, String>("job_id")?),
        agent_name: AgentName::from(row.get::<_, String>("agent_name")?.as_str()),
        verdict: parse_verdict(&row.get::<_, String>("verdict")?)?,
        confidence: row.get("confidence")?,
        payload: serde_json::Value::from_str(&payload_raw).map_err(|err| corrupt_row(err.to_string()))?,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
    })
}

fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReleaseDecision> {
    let summary_raw: String = row.get("agent_results")?;
    let agent_results: Vec<AgentResultSummary> =
        serde_json::from_str(&summary_raw).map_err(|err| corrupt_row(err.to_string()))?;
    Ok(ReleaseDecision {
        job_id: JobId::from_string(row.get::<_, String>("job_id")?),
        verdict: parse_verdict(&row.get::<_, String>("verdict")?)?,
        score: row.get("score")?,
        explanation: row.get("explanation")?,
        agent_results,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool;
    use ci_core::{Clock, FakeClock};

    fn store() -> SqliteStore {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let name = format!("store_test_{}", COUNTER.fetch_add(1, Ordering::Relaxed));
        SqliteStore::new(pool::open_in_memory(&name).unwrap())
    }

    fn job(clock: &FakeClock) -> Job {
        Job::new(clock, "acme/widgets", "deadbeef", "fix: thing", "main", "ada")
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let store = store();
        let clock = FakeClock::new();
        let j = job(&clock);

        store.create_job(&j).await.unwrap();
        let fetched = store.get_job(&j.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, j.id);
        assert_eq!(fetched.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_job_is_none_not_error() {
        let store = store();
        assert!(store.get_job(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_processing_is_a_noop_once_completed() {
        let store = store();
        let clock = FakeClock::new();
        let j = job(&clock);
        store.create_job(&j).await.unwrap();

        store.mark_processing(&j.id).await.unwrap();
        store.mark_completed(&j.id, clock.utc_now()).await.unwrap();
        store.mark_processing(&j.id).await.unwrap();

        let fetched = store.get_job(&j.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn upsert_agent_result_overwrites_same_key() {
        let store = store();
        let clock = FakeClock::new();
        let j = job(&clock);
        store.create_job(&j).await.unwrap();

        let first = AgentResult::new(
            j.id,
            "security",
            Verdict::Approve,
            0.6,
            serde_json::json!({"pass": 1}),
            clock.utc_now(),
        )
        .unwrap();
        store.upsert_agent_result(&first).await.unwrap();

        let second = AgentResult::new(
            j.id,
            "security",
            Verdict::Reject,
            0.95,
            serde_json::json!({"pass": 2}),
            clock.utc_now(),
        )
        .unwrap();
        store.upsert_agent_result(&second).await.unwrap();

        let results = store.list_agent_results(&j.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn insert_decision_rejects_second_insert_for_same_job() {
        let store = store();
        let clock = FakeClock::new();
        let j = job(&clock);
        store.create_job(&j).await.unwrap();

        let decision = ReleaseDecision {
            job_id: j.id,
            verdict: Verdict::Approve,
            score: 0.9,
            explanation: "looks fine".into(),
            agent_results: vec![],
            created_at: clock.utc_now(),
        };

        assert!(store.insert_decision(&decision).await.unwrap());
        assert!(!store.insert_decision(&decision).await.unwrap());
        assert!(store.get_decision(&j.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_jobs_filters_by_repo_and_orders_newest_first() {
        let store = store();
        let clock = FakeClock::new();

        let j1 = Job::new(&clock, "acme/widgets", "c1", "m1", "main", "ada");
        store.create_job(&j1).await.unwrap();
        clock.advance(std::time::Duration::from_secs(1));
        let j2 = Job::new(&clock, "acme/widgets", "c2", "m2", "main", "bea");
        store.create_job(&j2).await.unwrap();
        let other = Job::new(&clock, "acme/other", "c3", "m3", "main", "cid");
        store.create_job(&other).await.unwrap();

        let jobs = store.list_jobs(Some("acme/widgets"), 10).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, j2.id);
        assert_eq!(jobs[1].id, j1.id);
    }

    #[tokio::test]
    async fn find_job_by_commit_locates_existing_job() {
        let store = store();
        let clock = FakeClock::new();
        let j = job(&clock);
        store.create_job(&j).await.unwrap();

        let found = store.find_job_by_commit("acme/widgets", "deadbeef").await.unwrap().unwrap();
        assert_eq!(found.id, j.id);
        assert!(store.find_job_by_commit("acme/widgets", "nope").await.unwrap().is_none());
    }
}
