// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! An in-process, durable-within-process message bus.
//!
//! Each [`Topic`] is an append-only log; each consumer group tracks its own
//! read cursor and its own pending-entry table, mirroring Redis Streams'
//! `XADD`/`XREADGROUP`/`XACK`/`XCLAIM`/`XPENDING` semantics closely enough
//! that the orchestrator, arbiter, and analyzer workers built against this
//! trait port to a real Redis-backed implementation without a rewrite.

use crate::error::BusError;
use crate::event::Event;
use crate::message::{BusMessage, MessageId};
use crate::topic::Topic;
use async_trait::async_trait;
use ci_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Append `event` to `topic`'s log, returning its assigned id.
    async fn publish(&self, topic: Topic, event: Event) -> Result<MessageId, BusError>;

    /// Create `group` on `topic` if it doesn't already exist. Idempotent,
    /// matching `XGROUP CREATE ... MKSTREAM` with `BUSYGROUP` swallowed.
    async fn ensure_group(&self, topic: Topic, group: &str);

    /// Read up to `count` new (never-delivered-to-this-group) messages,
    /// recording them as pending for `consumer`. Returns immediately with
    /// whatever is available, possibly empty.
    async fn read_group(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<BusMessage>, BusError>;

    /// Acknowledge a message, removing it from the group's pending table.
    async fn ack(&self, topic: Topic, group: &str, id: MessageId) -> Result<(), BusError>;

    /// Count of messages delivered but not yet acknowledged for `group`.
    async fn pending_count(&self, topic: Topic, group: &str) -> Result<usize, BusError>;

    /// Reassign pending messages idle for at least `min_idle` to `consumer`,
    /// returning the reclaimed messages so the caller can retry them.
    async fn claim_idle(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
        min_idle: Duration,
    ) -> Result<Vec<BusMessage>, BusError>;

    /// Block (up to `timeout`) until a publish occurs on `topic`, or return
    /// immediately once it elapses. A backoff primitive for worker loops,
    /// not part of the deterministic read/ack/claim contract above.
    async fn wait_for_publish(&self, topic: Topic, timeout: Duration);
}

struct PendingEntry {
    message: BusMessage,
    consumer: String,
    delivered_at: Instant,
}

#[derive(Default)]
struct ConsumerGroup {
    /// Index into the topic's log of the next undelivered message.
    cursor: usize,
    pending: HashMap<MessageId, PendingEntry>,
}

struct TopicState {
    log: Vec<BusMessage>,
    groups: HashMap<String, ConsumerGroup>,
    notify: Arc<Notify>,
}

impl Default for TopicState {
    fn default() -> Self {
        Self { log: Vec::new(), groups: HashMap::new(), notify: Arc::new(Notify::new()) }
    }
}

pub struct MemoryBus<C: Clock = SystemClock> {
    clock: C,
    topics: Mutex<HashMap<Topic, TopicState>>,
}

impl MemoryBus<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryBus<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryBus<C> {
    pub fn with_clock(clock: C) -> Self {
        let topics = Topic::ALL.into_iter().map(|t| (t, TopicState::default())).collect();
        Self { clock, topics: Mutex::new(topics) }
    }
}

#[async_trait]
impl<C: Clock> MessageBus for MemoryBus<C> {
    async fn publish(&self, topic: Topic, event: Event) -> Result<MessageId, BusError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        let id = state.log.len() as MessageId + 1;
        let job_id = event.job_id();
        state.log.push(BusMessage { id, event });
        state.notify.notify_waiters();
        info!(topic = %topic, message_id = id, %job_id, "published message");
        Ok(id)
    }

    async fn ensure_group(&self, topic: Topic, group: &str) {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        if !state.groups.contains_key(group) {
            state.groups.insert(group.to_string(), ConsumerGroup::default());
            info!(topic = %topic, group, "created consumer group");
        }
    }

    async fn read_group(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<BusMessage>, BusError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        let now = self.clock.now();
        let cg = state
            .groups
            .get_mut(group)
            .ok_or_else(|| BusError::UnknownGroup { topic: topic.as_str(), group: group.to_string() })?;

        let available = &state.log[cg.cursor..];
        let take = available.len().min(count);
        let batch: Vec<BusMessage> = available[..take].to_vec();
        cg.cursor += take;

        for message in &batch {
            cg.pending.insert(
                message.id,
                PendingEntry { message: message.clone(), consumer: consumer.to_string(), delivered_at: now },
            );
        }

        if !batch.is_empty() {
            debug!(topic = %topic, group, consumer, count = batch.len(), "delivered messages");
        }
        Ok(batch)
    }

    async fn ack(&self, topic: Topic, group: &str, id: MessageId) -> Result<(), BusError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        let cg = state
            .groups
            .get_mut(group)
            .ok_or_else(|| BusError::UnknownGroup { topic: topic.as_str(), group: group.to_string() })?;

        if cg.pending.remove(&id).is_none() {
            return Err(BusError::MessageNotPending(id.to_string()));
        }
        debug!(topic = %topic, group, message_id = id, "acknowledged message");
        Ok(())
    }

    async fn pending_count(&self, topic: Topic, group: &str) -> Result<usize, BusError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        let cg = state
            .groups
            .get(group)
            .ok_or_else(|| BusError::UnknownGroup { topic: topic.as_str(), group: group.to_string() })?;
        Ok(cg.pending.len())
    }

    async fn claim_idle(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
        min_idle: Duration,
    ) -> Result<Vec<BusMessage>, BusError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        let now = self.clock.now();
        let cg = state
            .groups
            .get_mut(group)
            .ok_or_else(|| BusError::UnknownGroup { topic: topic.as_str(), group: group.to_string() })?;

        let mut reclaimed = Vec::new();
        for entry in cg.pending.values_mut() {
            if now.saturating_duration_since(entry.delivered_at) >= min_idle {
                entry.consumer = consumer.to_string();
                entry.delivered_at = now;
                reclaimed.push(entry.message.clone());
            }
        }

        if !reclaimed.is_empty() {
            warn!(topic = %topic, group, consumer, count = reclaimed.len(), "claimed idle messages");
        }
        Ok(reclaimed)
    }

    async fn wait_for_publish(&self, topic: Topic, timeout: Duration) {
        let notify = {
            let mut topics = self.topics.lock();
            topics.entry(topic).or_default().notify.clone()
        };
        let _ = tokio::time::timeout(timeout, notify.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ci_core::{FakeClock, JobId};
    use chrono::Utc;

    fn sample_event() -> Event {
        Event::CodeAnalysisRequested {
            job_id: JobId::new(),
            repo_name: "acme/widgets".into(),
            commit_hash: "deadbeef".into(),
            commit_message: "fix: thing".into(),
            diff: "+ line".into(),
            branch: "main".into(),
            author: "ada".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_then_read_delivers_in_order() {
        let bus = MemoryBus::new();
        bus.ensure_group(Topic::CodeAnalysisRequested, "diff_group").await;

        bus.publish(Topic::CodeAnalysisRequested, sample_event()).await.unwrap();
        bus.publish(Topic::CodeAnalysisRequested, sample_event()).await.unwrap();

        let batch =
            bus.read_group(Topic::CodeAnalysisRequested, "diff_group", "diff-0", 10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, 1);
        assert_eq!(batch[1].id, 2);
    }

    #[tokio::test]
    async fn unread_messages_stay_pending_until_acked() {
        let bus = MemoryBus::new();
        bus.ensure_group(Topic::CodeAnalysisRequested, "g").await;
        bus.publish(Topic::CodeAnalysisRequested, sample_event()).await.unwrap();

        let batch = bus.read_group(Topic::CodeAnalysisRequested, "g", "c1", 10).await.unwrap();
        assert_eq!(bus.pending_count(Topic::CodeAnalysisRequested, "g").await.unwrap(), 1);

        bus.ack(Topic::CodeAnalysisRequested, "g", batch[0].id).await.unwrap();
        assert_eq!(bus.pending_count(Topic::CodeAnalysisRequested, "g").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn separate_groups_each_get_every_message() {
        let bus = MemoryBus::new();
        bus.ensure_group(Topic::CodeAnalysisRequested, "group_a").await;
        bus.ensure_group(Topic::CodeAnalysisRequested, "group_b").await;
        bus.publish(Topic::CodeAnalysisRequested, sample_event()).await.unwrap();

        let a = bus.read_group(Topic::CodeAnalysisRequested, "group_a", "a1", 10).await.unwrap();
        let b = bus.read_group(Topic::CodeAnalysisRequested, "group_b", "b1", 10).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[tokio::test]
    async fn claim_idle_reassigns_only_after_min_idle_elapses() {
        let clock = FakeClock::new();
        let bus = MemoryBus::with_clock(clock.clone());
        bus.ensure_group(Topic::AgentResults, "g").await;
        bus.publish(Topic::AgentResults, sample_event()).await.unwrap();
        bus.read_group(Topic::AgentResults, "g", "stuck-consumer", 10).await.unwrap();

        let none_yet = bus.claim_idle(Topic::AgentResults, "g", "rescuer", Duration::from_secs(300)).await.unwrap();
        assert!(none_yet.is_empty());

        clock.advance(Duration::from_secs(301));

        let claimed = bus.claim_idle(Topic::AgentResults, "g", "rescuer", Duration::from_secs(300)).await.unwrap();
        assert_eq!(claimed.len(), 1);
    }

    #[tokio::test]
    async fn ack_of_unknown_message_is_an_error() {
        let bus = MemoryBus::new();
        bus.ensure_group(Topic::ReleaseDecisions, "g").await;
        let err = bus.ack(Topic::ReleaseDecisions, "g", 999).await.unwrap_err();
        assert!(matches!(err, BusError::MessageNotPending(_)));
    }

    #[tokio::test]
    async fn read_from_unknown_group_is_an_error() {
        let bus = MemoryBus::new();
        let err = bus.read_group(Topic::ReleaseDecisions, "ghost", "c", 1).await.unwrap_err();
        assert!(matches!(err, BusError::UnknownGroup { .. }));
    }
}
