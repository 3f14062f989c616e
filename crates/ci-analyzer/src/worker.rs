// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The generic worker loop: wraps any [`Analyzer`] in bus consumption,
//! a per-call deadline, and the retry/skip policy of §4.4's execution
//! protocol.

use crate::analyzer::Analyzer;
use crate::request::AnalysisRequest;
use ci_bus::{BusMessage, Event, MessageBus, Topic};
use ci_core::{AgentResult, Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Tunables for one worker instance. Mirrors `agent_timeout_seconds` and
/// `max_retries` from the shared configuration (§6).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub consumer_name: String,
    pub analyze_deadline: Duration,
    pub max_retries: u32,
    pub min_idle_for_reclaim: Duration,
    pub batch_size: usize,
    pub poll_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            consumer_name: "worker-0".to_string(),
            analyze_deadline: Duration::from_secs(300),
            max_retries: 3,
            min_idle_for_reclaim: Duration::from_secs(60),
            batch_size: 10,
            poll_timeout: Duration::from_secs(5),
        }
    }
}

/// Drives one [`Analyzer`] against a [`MessageBus`] forever.
///
/// Each worker owns its own consumer group (`"<agent_name>_group"`), so N
/// analyzers fan out independently over the same `code_analysis_requested`
/// topic (§2's AW×N).
pub struct AnalyzerWorker<A: Analyzer, C: Clock = SystemClock> {
    analyzer: Arc<A>,
    bus: Arc<dyn MessageBus>,
    clock: C,
    config: WorkerConfig,
    attempts: HashMap<ci_bus::MessageId, u32>,
}

impl<A: Analyzer> AnalyzerWorker<A, SystemClock> {
    pub fn new(analyzer: Arc<A>, bus: Arc<dyn MessageBus>, config: WorkerConfig) -> Self {
        Self::with_clock(analyzer, bus, SystemClock, config)
    }
}

impl<A: Analyzer, C: Clock> AnalyzerWorker<A, C> {
    pub fn with_clock(analyzer: Arc<A>, bus: Arc<dyn MessageBus>, clock: C, config: WorkerConfig) -> Self {
        Self { analyzer, bus, clock, config, attempts: HashMap::new() }
    }

    pub fn group_name(&self) -> String {
        format!("{}_group", self.analyzer.agent_name())
    }

    /// Run forever. Callers typically spawn this as a `tokio::task`.
    pub async fn run(&mut self) -> ! {
        let group = self.group_name();
        self.bus.ensure_group(Topic::CodeAnalysisRequested, &group).await;

        loop {
            let processed = self.tick(&group).await;
            if !processed {
                self.bus.wait_for_publish(Topic::CodeAnalysisRequested, self.config.poll_timeout).await;
            }
        }
    }

    /// Process one batch of reclaimed-or-fresh messages. Returns whether
    /// anything was processed, so [`Self::run`] knows whether to block.
    pub async fn tick(&mut self, group: &str) -> bool {
        let reclaimed = self
            .bus
            .claim_idle(
                Topic::CodeAnalysisRequested,
                group,
                &self.config.consumer_name,
                self.config.min_idle_for_reclaim,
            )
            .await
            .unwrap_or_default();

        let fresh = self
            .bus
            .read_group(Topic::CodeAnalysisRequested, group, &self.config.consumer_name, self.config.batch_size)
            .await
            .unwrap_or_default();

        let batch: Vec<BusMessage> = reclaimed.into_iter().chain(fresh).collect();
        if batch.is_empty() {
            return false;
        }

        for message in batch {
            self.process_one(group, message).await;
        }
        true
    }

    async fn process_one(&mut self, group: &str, message: BusMessage) {
        let request = match to_request(&message.event) {
            Some(request) => request,
            None => {
                // Not our topic's expected event shape; ack it away rather
                // than retry something that can never succeed.
                let _ = self.bus.ack(Topic::CodeAnalysisRequested, group, message.id).await;
                return;
            }
        };

        let agent_name = self.analyzer.agent_name();
        let outcome =
            tokio::time::timeout(self.config.analyze_deadline, self.analyzer.analyze(&request)).await;

        match outcome {
            Ok(Ok((verdict, confidence, payload))) => {
                self.publish_result(group, message.id, request.job_id, verdict, confidence, payload).await;
                self.attempts.remove(&message.id);
            }
            Ok(Err(err)) => {
                warn!(agent = agent_name, job_id = %request.job_id, error = %err, "analyzer call failed");
                self.retry_or_skip(group, message.id, &request).await;
            }
            Err(_elapsed) => {
                warn!(agent = agent_name, job_id = %request.job_id, "analyzer call timed out");
                self.retry_or_skip(group, message.id, &request).await;
            }
        }
    }

    async fn retry_or_skip(&mut self, group: &str, message_id: ci_bus::MessageId, request: &AnalysisRequest) {
        let attempts = self.attempts.entry(message_id).or_insert(0);
        *attempts += 1;

        if *attempts > self.config.max_retries {
            error!(
                agent = self.analyzer.agent_name(),
                job_id = %request.job_id,
                attempts = *attempts,
                "retry budget exhausted, publishing skip verdict"
            );
            let payload = serde_json::json!({
                "error": "analyzer failed or timed out after retry budget",
                "attempts": *attempts,
            });
            self.publish_result(group, message_id, request.job_id, ci_core::Verdict::Skip, 0.5, payload)
                .await;
            self.attempts.remove(&message_id);
        }
        // Otherwise leave the message unacked; `claim_idle` redelivers it
        // once it has been idle long enough (§4.1's reclaim mechanism).
    }

    async fn publish_result(
        &self,
        group: &str,
        message_id: ci_bus::MessageId,
        job_id: ci_core::JobId,
        verdict: ci_core::Verdict,
        confidence: f64,
        payload: serde_json::Value,
    ) {
        let event = Event::AgentResult {
            job_id,
            agent_name: self.analyzer.agent_name().into(),
            verdict,
            confidence,
            payload,
            timestamp: self.clock.utc_now(),
        };

        if let Err(err) = self.bus.publish(Topic::AgentResults, event).await {
            error!(job_id = %job_id, error = %err, "failed to publish agent result; leaving message unacked");
            return;
        }

        if let Err(err) = self.bus.ack(Topic::CodeAnalysisRequested, group, message_id).await {
            error!(job_id = %job_id, error = %err, "failed to ack processed message");
            return;
        }

        info!(
            agent = self.analyzer.agent_name(),
            job_id = %job_id,
            verdict = %verdict,
            confidence,
            "published agent result"
        );
    }
}

fn to_request(event: &Event) -> Option<AnalysisRequest> {
    match event {
        Event::CodeAnalysisRequested {
            job_id,
            repo_name,
            commit_hash,
            commit_message,
            diff,
            branch,
            author,
            ..
        } => Some(AnalysisRequest {
            job_id: *job_id,
            repo_name: repo_name.clone(),
            commit_hash: commit_hash.clone(),
            commit_message: commit_message.clone(),
            diff: diff.clone(),
            branch: branch.clone(),
            author: author.clone(),
        }),
        _ => None,
    }
}

/// Build an [`AgentResult`] from a raw `agent_results` event, for callers
/// (the orchestrator, the arbiter) that read the bus directly rather than
/// through a worker.
pub fn agent_result_from_event(event: &Event) -> Option<AgentResult> {
    match event {
        Event::AgentResult { job_id, agent_name, verdict, confidence, payload, timestamp } => {
            AgentResult::new(*job_id, agent_name.clone(), *verdict, *confidence, payload.clone(), *timestamp).ok()
        }
        _ => None,
    }
}
