// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The fan-in loop: consumes `agent_results`, accumulates per job, and
//! publishes exactly one `release_decisions` record per job (§4.5).
//!
//! The wait deadline starts on a job's *first* result, not on job creation,
//! so a slow first analyzer can't itself starve the job (§4.5's timeline).
//! A timer task is spawned per job and raced against the "all agents
//! reported" fast path; whichever wins decides, and the accumulator's
//! `decided` guard makes the other one a no-op.

use crate::explain::{blocking_issues, render_explanation};
use crate::score::{final_verdict, weighted_score};
use crate::weights::AgentWeights;
use ci_bus::{Event, MessageBus, Topic};
use ci_core::{AgentName, AgentResultSummary, Clock, JobId, SystemClock, Verdict};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

enum JobState {
    Pending(HashMap<AgentName, AgentResultSummary>),
    Decided,
}

/// Per-job result accumulation, independent of the bus. Exposed on its own
/// so the "exactly once" guard can be unit tested without a running bus.
#[derive(Default)]
struct Accumulator {
    jobs: HashMap<JobId, JobState>,
}

enum RecordOutcome {
    /// Not all expected agents have reported yet.
    Waiting,
    /// Every expected agent reported; `results` is the full snapshot and
    /// the job has already been marked decided.
    Ready(Vec<AgentResultSummary>),
    /// This job already produced a decision; the result was recorded into
    /// nothing (a true no-op, matching §8 scenario 6's duplicate-delivery
    /// case).
    AlreadyDecided,
}

impl Accumulator {
    fn record(&mut self, job_id: JobId, result: AgentResultSummary, expected: usize) -> RecordOutcome {
        let state = self.jobs.entry(job_id).or_insert_with(|| JobState::Pending(HashMap::new()));
        let results = match state {
            JobState::Pending(results) => results,
            JobState::Decided => return RecordOutcome::AlreadyDecided,
        };
        results.insert(result.agent_name.clone(), result);

        let snapshot =
            if results.len() >= expected { Some(results.values().cloned().collect::<Vec<_>>()) } else { None };

        match snapshot {
            Some(snapshot) => {
                self.jobs.insert(job_id, JobState::Decided);
                RecordOutcome::Ready(snapshot)
            }
            None => RecordOutcome::Waiting,
        }
    }

    /// Called when the wait deadline fires: decide with whatever is there,
    /// unless a decision already happened via the fast path.
    fn expire(&mut self, job_id: JobId) -> Option<Vec<AgentResultSummary>> {
        let snapshot = match self.jobs.get(&job_id) {
            Some(JobState::Pending(results)) => Some(results.values().cloned().collect::<Vec<_>>()),
            _ => None,
        };

        snapshot.map(|snapshot| {
            self.jobs.insert(job_id, JobState::Decided);
            snapshot
        })
    }

    fn has_pending_job(&self, job_id: &JobId) -> bool {
        matches!(self.jobs.get(job_id), Some(JobState::Pending(_)))
    }

    fn pending_job_count(&self) -> usize {
        self.jobs.values().filter(|s| matches!(s, JobState::Pending(_))).count()
    }
}

/// Tunables for the arbiter's fan-in policy.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    pub consumer_name: String,
    /// Deadline after the first result, not after job creation (default
    /// 600s, mirroring `arbiter_wait_timeout_seconds`).
    pub wait_timeout: Duration,
    pub batch_size: usize,
    pub poll_timeout: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            consumer_name: "arbiter-1".to_string(),
            wait_timeout: Duration::from_secs(600),
            batch_size: 10,
            poll_timeout: Duration::from_secs(5),
        }
    }
}

pub const CONSUMER_GROUP: &str = "arbiter";

pub struct ArbiterService<C: Clock = SystemClock> {
    bus: Arc<dyn MessageBus>,
    clock: C,
    weights: AgentWeights,
    config: ArbiterConfig,
    accumulator: Arc<Mutex<Accumulator>>,
    timers: Arc<Mutex<HashMap<JobId, JoinHandle<()>>>>,
}

impl ArbiterService<SystemClock> {
    pub fn new(bus: Arc<dyn MessageBus>, weights: AgentWeights, config: ArbiterConfig) -> Self {
        Self::with_clock(bus, SystemClock, weights, config)
    }
}

impl<C: Clock> ArbiterService<C> {
    pub fn with_clock(bus: Arc<dyn MessageBus>, clock: C, weights: AgentWeights, config: ArbiterConfig) -> Self {
        Self {
            bus,
            clock,
            weights,
            config,
            accumulator: Arc::new(Mutex::new(Accumulator::default())),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Pending-job count, for the `/metrics` surface.
    pub fn pending_decisions(&self) -> usize {
        self.accumulator.lock().pending_job_count()
    }

    /// Run forever. Callers typically spawn this as a `tokio::task`.
    pub async fn run(&self) -> ! {
        self.bus.ensure_group(Topic::AgentResults, CONSUMER_GROUP).await;

        loop {
            let processed = self.tick().await;
            if !processed {
                self.bus.wait_for_publish(Topic::AgentResults, self.config.poll_timeout).await;
            }
        }
    }

    pub async fn tick(&self) -> bool {
        let batch = self
            .bus
            .read_group(Topic::AgentResults, CONSUMER_GROUP, &self.config.consumer_name, self.config.batch_size)
            .await
            .unwrap_or_default();

        if batch.is_empty() {
            return false;
        }

        for message in batch {
            let Some((job_id, result)) = agent_result_summary(&message.event) else {
                let _ = self.bus.ack(Topic::AgentResults, CONSUMER_GROUP, message.id).await;
                continue;
            };

            info!(%job_id, agent = %result.agent_name, "received agent result");

            let outcome = self.accumulator.lock().record(job_id, result, self.weights.expected_count());

            // Ack right after the in-memory state update is durable, not
            // after the (possibly much later) decision (§4.5 step 5).
            if let Err(err) = self.bus.ack(Topic::AgentResults, CONSUMER_GROUP, message.id).await {
                error!(%job_id, error = %err, "failed to ack agent result");
            }

            match outcome {
                RecordOutcome::Ready(snapshot) => {
                    self.cancel_timer(job_id);
                    self.publish_decision(job_id, snapshot).await;
                }
                RecordOutcome::Waiting => {
                    self.arm_timer_if_absent(job_id);
                }
                RecordOutcome::AlreadyDecided => {
                    info!(%job_id, "duplicate agent result after decision, ignored");
                }
            }
        }
        true
    }

    fn arm_timer_if_absent(&self, job_id: JobId) {
        let mut timers = self.timers.lock();
        if timers.contains_key(&job_id) {
            return;
        }

        let accumulator = self.accumulator.clone();
        let bus = self.bus.clone();
        let weights = self.weights.clone();
        let wait_timeout = self.config.wait_timeout;
        let timers_handle = self.timers.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait_timeout).await;

            let snapshot = accumulator.lock().expire(job_id);
            timers_handle.lock().remove(&job_id);

            if let Some(results) = snapshot {
                warn!(%job_id, "wait deadline elapsed, deciding with partial results");
                publish_decision_with(&bus, &weights, job_id, results).await;
            }
        });

        timers.insert(job_id, handle);
    }

    fn cancel_timer(&self, job_id: JobId) {
        if let Some(handle) = self.timers.lock().remove(&job_id) {
            handle.abort();
        }
    }

    async fn publish_decision(&self, job_id: JobId, results: Vec<AgentResultSummary>) {
        publish_decision_with(&self.bus, &self.weights, job_id, results).await;
    }

    #[cfg(test)]
    fn has_pending_job(&self, job_id: &JobId) -> bool {
        self.accumulator.lock().has_pending_job(job_id)
    }
}

async fn publish_decision_with(
    bus: &Arc<dyn MessageBus>,
    weights: &AgentWeights,
    job_id: JobId,
    results: Vec<AgentResultSummary>,
) {
    // Degenerate path: the timer is only armed after at least one result
    // (§4.5), so this should never fire in practice. Handled anyway per
    // spec: publish a reject rather than silently dropping the job.
    if results.is_empty() {
        warn!(%job_id, "wait deadline fired with zero results, publishing degenerate reject");
        let event = Event::ReleaseDecision {
            job_id,
            verdict: Verdict::Reject,
            score: 0.0,
            explanation: "no analyzer reported".to_string(),
            agent_results: Vec::new(),
            timestamp: chrono::Utc::now(),
        };
        if let Err(err) = bus.publish(Topic::ReleaseDecisions, event).await {
            error!(%job_id, error = %err, "failed to publish degenerate release decision");
        }
        return;
    }

    let score = weighted_score(&results, weights);
    let verdict = final_verdict(&results, score, weights);
    let explanation = render_explanation(&results, score, verdict);
    let _blocking = blocking_issues(&results);

    let event = Event::ReleaseDecision {
        job_id,
        verdict,
        score,
        explanation,
        agent_results: results,
        timestamp: chrono::Utc::now(),
    };

    match bus.publish(Topic::ReleaseDecisions, event).await {
        Ok(_) => info!(%job_id, %verdict, score, "published release decision"),
        Err(err) => error!(%job_id, error = %err, "failed to publish release decision"),
    }
}

/// Unwraps an `agent_result` event into its job id and summary, ignoring
/// any other event shape (this consumer group only sees `AgentResults`).
fn agent_result_summary(event: &Event) -> Option<(JobId, AgentResultSummary)> {
    match event {
        Event::AgentResult { job_id, agent_name, verdict, confidence, .. } => {
            Some((*job_id, AgentResultSummary { agent_name: agent_name.clone(), verdict: *verdict, confidence: *confidence }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ci_bus::MemoryBus;
    use ci_core::FakeClock;

    async fn publish_result(bus: &Arc<dyn MessageBus>, job_id: JobId, agent_name: &str, verdict: Verdict) {
        bus.publish(
            Topic::AgentResults,
            Event::AgentResult {
                job_id,
                agent_name: agent_name.into(),
                verdict,
                confidence: 0.9,
                payload: serde_json::json!({}),
                timestamp: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    async fn read_decisions(bus: &Arc<dyn MessageBus>) -> Vec<Event> {
        bus.ensure_group(Topic::ReleaseDecisions, "probe").await;
        bus.read_group(Topic::ReleaseDecisions, "probe", "p", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.event)
            .collect()
    }

    #[tokio::test]
    async fn all_five_agents_reporting_decides_immediately() {
        let clock = FakeClock::new();
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::with_clock(clock.clone()));
        let job_id = JobId::new();
        for agent in ["diff", "intent", "security", "performance", "test"] {
            publish_result(&bus, job_id, agent, Verdict::Approve).await;
        }

        let service = ArbiterService::with_clock(bus.clone(), clock, AgentWeights::default(), ArbiterConfig::default());
        assert!(service.tick().await);
        assert!(!service.has_pending_job(&job_id));

        let decisions = read_decisions(&bus).await;
        assert_eq!(decisions.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_result_after_decision_is_a_no_op() {
        let clock = FakeClock::new();
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::with_clock(clock.clone()));
        let job_id = JobId::new();
        for agent in ["diff", "intent", "security", "performance", "test"] {
            publish_result(&bus, job_id, agent, Verdict::Approve).await;
        }

        let service = ArbiterService::with_clock(bus.clone(), clock, AgentWeights::default(), ArbiterConfig::default());
        assert!(service.tick().await);

        publish_result(&bus, job_id, "security", Verdict::Approve).await;
        assert!(service.tick().await);

        let decisions = read_decisions(&bus).await;
        assert_eq!(decisions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_deadline_decides_with_partial_results() {
        let clock = FakeClock::new();
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::with_clock(clock.clone()));
        let job_id = JobId::new();
        for agent in ["diff", "intent", "security", "test"] {
            publish_result(&bus, job_id, agent, Verdict::Approve).await;
        }

        let config = ArbiterConfig { wait_timeout: Duration::from_secs(5), ..ArbiterConfig::default() };
        let service = ArbiterService::with_clock(bus.clone(), clock, AgentWeights::default(), config);
        assert!(service.tick().await);
        assert!(service.has_pending_job(&job_id));

        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert!(!service.has_pending_job(&job_id));
        let decisions = read_decisions(&bus).await;
        assert_eq!(decisions.len(), 1);
    }

    #[tokio::test]
    async fn zero_results_at_decide_time_still_publishes_a_reject() {
        let clock = FakeClock::new();
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::with_clock(clock));
        let job_id = JobId::new();

        publish_decision_with(&bus, &AgentWeights::default(), job_id, Vec::new()).await;

        let decisions = read_decisions(&bus).await;
        assert_eq!(decisions.len(), 1);
        match &decisions[0] {
            Event::ReleaseDecision { verdict, explanation, .. } => {
                assert_eq!(*verdict, Verdict::Reject);
                assert_eq!(explanation, "no analyzer reported");
            }
            other => panic!("expected a release decision, got {other:?}"),
        }
    }
}
