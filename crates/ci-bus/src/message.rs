// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The envelope a consumer actually reads off a topic.

use crate::event::Event;

/// Monotonically increasing per-topic sequence number, playing the role
/// Redis Streams' `<ms>-<seq>` entry ID plays for the prototype this bus
/// replaces — ordering and dedup keys, nothing more.
pub type MessageId = u64;

#[derive(Debug, Clone)]
pub struct BusMessage {
    pub id: MessageId,
    pub event: Event,
}
