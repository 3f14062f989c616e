// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Two independent bus consumers, both in a single `"orchestrator"`
//! consumer group (§4.6): one mirrors `agent_results` into ST and advances
//! `pending -> processing`; the other mirrors `release_decisions` into ST
//! and advances `processing -> completed`.
//!
//! Across topics no ordering is guaranteed (§5): a `release_decisions`
//! event can be observed before every `agent_results` event that fed it,
//! because the arbiter and this orchestrator are independent consumers of
//! `agent_results`. ST's unique constraints (not in-memory ordering logic)
//! are what keep the invariants intact either way.

use crate::error::OrchestratorError;
use ci_bus::{BusMessage, Event, MessageBus, Topic};
use ci_core::{AgentResult, JobId, ReleaseDecision};
use ci_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const CONSUMER_GROUP: &str = "orchestrator";

/// Tunables for the mirroring loops.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub consumer_name: String,
    pub batch_size: usize,
    pub poll_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            consumer_name: "orchestrator-1".to_string(),
            batch_size: 10,
            poll_timeout: Duration::from_secs(5),
        }
    }
}

pub struct OrchestratorService {
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn Store>,
    config: OrchestratorConfig,
}

impl OrchestratorService {
    pub fn new(bus: Arc<dyn MessageBus>, store: Arc<dyn Store>, config: OrchestratorConfig) -> Self {
        Self { bus, store, config }
    }

    /// Run both mirroring loops forever, each as its own task. Callers
    /// typically await this from a dedicated `tokio::task`; it never
    /// returns under normal operation.
    pub async fn run(self: Arc<Self>) -> ! {
        self.bus.ensure_group(Topic::AgentResults, CONSUMER_GROUP).await;
        self.bus.ensure_group(Topic::ReleaseDecisions, CONSUMER_GROUP).await;

        let agent_results = {
            let this = self.clone();
            tokio::spawn(async move {
                loop {
                    let processed = this.tick_agent_results().await;
                    if !processed {
                        this.bus.wait_for_publish(Topic::AgentResults, this.config.poll_timeout).await;
                    }
                }
            })
        };

        let release_decisions = {
            let this = self.clone();
            tokio::spawn(async move {
                loop {
                    let processed = this.tick_release_decisions().await;
                    if !processed {
                        this.bus.wait_for_publish(Topic::ReleaseDecisions, this.config.poll_timeout).await;
                    }
                }
            })
        };

        // Both tasks run forever; if either panics, surface it rather than
        // silently degrading to single-topic mirroring.
        let (a, b) = tokio::join!(agent_results, release_decisions);
        a.expect("agent_results mirror loop panicked");
        b.expect("release_decisions mirror loop panicked");
        unreachable!("mirror loops never return Ok")
    }

    /// Process one batch of `agent_results` events. Returns whether
    /// anything was processed.
    pub async fn tick_agent_results(&self) -> bool {
        let batch = self
            .bus
            .read_group(Topic::AgentResults, CONSUMER_GROUP, &self.config.consumer_name, self.config.batch_size)
            .await
            .unwrap_or_default();

        if batch.is_empty() {
            return false;
        }

        for message in batch {
            self.handle_agent_result(message).await;
        }
        true
    }

    /// Process one batch of `release_decisions` events. Returns whether
    /// anything was processed.
    pub async fn tick_release_decisions(&self) -> bool {
        let batch = self
            .bus
            .read_group(
                Topic::ReleaseDecisions,
                CONSUMER_GROUP,
                &self.config.consumer_name,
                self.config.batch_size,
            )
            .await
            .unwrap_or_default();

        if batch.is_empty() {
            return false;
        }

        for message in batch {
            self.handle_release_decision(message).await;
        }
        true
    }

    async fn handle_agent_result(&self, message: BusMessage) {
        let Some(result) = agent_result_from_event(&message.event) else {
            let _ = self.bus.ack(Topic::AgentResults, CONSUMER_GROUP, message.id).await;
            return;
        };

        match self.mirror_agent_result(&result).await {
            Ok(()) => {
                if let Err(err) = self.bus.ack(Topic::AgentResults, CONSUMER_GROUP, message.id).await {
                    error!(job_id = %result.job_id, error = %err, "failed to ack agent result");
                }
            }
            Err(err) => {
                // Handlers never propagate to the bus loop (§7): log and
                // leave the message unacked for redelivery.
                warn!(job_id = %result.job_id, agent = %result.agent_name, error = %err, "failed to mirror agent result, leaving unacked");
            }
        }
    }

    async fn mirror_agent_result(&self, result: &AgentResult) -> Result<(), OrchestratorError> {
        // Upsert on (job_id, agent_name) absorbs at-least-once redelivery
        // (§4.1's delivery guarantee, invariant behind §8 scenario 6).
        self.store.upsert_agent_result(result).await?;
        self.store.mark_processing(&result.job_id).await?;
        info!(job_id = %result.job_id, agent = %result.agent_name, "mirrored agent result into store");
        Ok(())
    }

    async fn handle_release_decision(&self, message: BusMessage) {
        let Some((job_id, decision)) = release_decision_from_event(&message.event) else {
            let _ = self.bus.ack(Topic::ReleaseDecisions, CONSUMER_GROUP, message.id).await;
            return;
        };

        match self.mirror_release_decision(job_id, decision).await {
            Ok(()) => {
                if let Err(err) = self.bus.ack(Topic::ReleaseDecisions, CONSUMER_GROUP, message.id).await {
                    error!(%job_id, error = %err, "failed to ack release decision");
                }
            }
            Err(err) => {
                warn!(%job_id, error = %err, "failed to mirror release decision, leaving unacked");
            }
        }
    }

    async fn mirror_release_decision(
        &self,
        job_id: JobId,
        decision: ReleaseDecision,
    ) -> Result<(), OrchestratorError> {
        let completed_at = decision.created_at;
        let inserted = self.store.insert_decision(&decision).await?;
        if !inserted {
            // Duplicate decision, caught by the unique constraint on
            // `release_decisions.job_id` (§7's "Duplicate decision" taxon).
            // Silently dropped; the ack still proceeds since this is not a
            // failure from the orchestrator's perspective.
            info!(%job_id, "duplicate release decision dropped");
            return Ok(());
        }

        self.store.mark_completed(&job_id, completed_at).await?;
        info!(%job_id, verdict = %decision.verdict, "mirrored release decision into store");
        Ok(())
    }
}

fn agent_result_from_event(event: &Event) -> Option<AgentResult> {
    match event {
        Event::AgentResult { job_id, agent_name, verdict, confidence, payload, timestamp } => {
            AgentResult::new(*job_id, agent_name.clone(), *verdict, *confidence, payload.clone(), *timestamp).ok()
        }
        _ => None,
    }
}

fn release_decision_from_event(event: &Event) -> Option<(JobId, ReleaseDecision)> {
    match event {
        Event::ReleaseDecision { job_id, verdict, score, explanation, agent_results, timestamp } => Some((
            *job_id,
            ReleaseDecision {
                job_id: *job_id,
                verdict: *verdict,
                score: *score,
                explanation: explanation.clone(),
                agent_results: agent_results.clone(),
                created_at: *timestamp,
            },
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ci_bus::MemoryBus;
    use ci_core::{AgentResultSummary, Job, JobStatus, SystemClock, Verdict};
    use ci_store::{pool, SqliteStore};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn store() -> Arc<dyn Store> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let name = format!("orchestrator_test_{}", COUNTER.fetch_add(1, Ordering::Relaxed));
        Arc::new(SqliteStore::new(pool::open_in_memory(&name).unwrap()))
    }

    async fn publish_agent_result(bus: &Arc<dyn MessageBus>, job_id: JobId, agent_name: &str) {
        bus.publish(
            Topic::AgentResults,
            Event::AgentResult {
                job_id,
                agent_name: agent_name.into(),
                verdict: Verdict::Approve,
                confidence: 0.9,
                payload: serde_json::json!({}),
                timestamp: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    async fn publish_decision(bus: &Arc<dyn MessageBus>, job_id: JobId) {
        bus.publish(
            Topic::ReleaseDecisions,
            Event::ReleaseDecision {
                job_id,
                verdict: Verdict::Approve,
                score: 0.9,
                explanation: "looks fine".into(),
                agent_results: vec![AgentResultSummary {
                    agent_name: "diff".into(),
                    verdict: Verdict::Approve,
                    confidence: 0.9,
                }],
                timestamp: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn agent_result_moves_job_from_pending_to_processing() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let store = store();
        let job = Job::new(&SystemClock, "acme/widgets", "deadbeef", "fix: thing", "main", "ada");
        store.create_job(&job).await.unwrap();

        publish_agent_result(&bus, job.id, "diff").await;
        let orchestrator = OrchestratorService::new(bus.clone(), store.clone(), OrchestratorConfig::default());
        orchestrator.bus.ensure_group(Topic::AgentResults, CONSUMER_GROUP).await;
        assert!(orchestrator.tick_agent_results().await);

        let fetched = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn release_decision_completes_the_job_and_inserts_once() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let store = store();
        let job = Job::new(&SystemClock, "acme/widgets", "deadbeef", "fix: thing", "main", "ada");
        store.create_job(&job).await.unwrap();

        publish_decision(&bus, job.id).await;
        let orchestrator = OrchestratorService::new(bus.clone(), store.clone(), OrchestratorConfig::default());
        orchestrator.bus.ensure_group(Topic::ReleaseDecisions, CONSUMER_GROUP).await;
        assert!(orchestrator.tick_release_decisions().await);

        let fetched = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        assert!(fetched.completed_at.is_some());
        assert!(store.get_decision(&job.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_agent_result_upserts_a_single_row() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let store = store();
        let job = Job::new(&SystemClock, "acme/widgets", "deadbeef", "fix: thing", "main", "ada");
        store.create_job(&job).await.unwrap();

        publish_agent_result(&bus, job.id, "security").await;
        publish_agent_result(&bus, job.id, "security").await;

        let orchestrator = OrchestratorService::new(bus.clone(), store.clone(), OrchestratorConfig::default());
        orchestrator.bus.ensure_group(Topic::AgentResults, CONSUMER_GROUP).await;
        assert!(orchestrator.tick_agent_results().await);

        let results = store.list_agent_results(&job.id).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn decision_for_unknown_job_is_not_acked_and_leaves_no_row() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let store = store();
        let orphan_job_id = JobId::new();

        publish_decision(&bus, orphan_job_id).await;
        let orchestrator = OrchestratorService::new(bus.clone(), store.clone(), OrchestratorConfig::default());
        orchestrator.bus.ensure_group(Topic::ReleaseDecisions, CONSUMER_GROUP).await;
        assert!(orchestrator.tick_release_decisions().await);

        assert!(store.get_decision(&orphan_job_id).await.unwrap().is_none());
        assert_eq!(
            bus.pending_count(Topic::ReleaseDecisions, CONSUMER_GROUP).await.unwrap(),
            1,
            "message for a nonexistent job should stay pending, not be silently acked"
        );
    }
}
