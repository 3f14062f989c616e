// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ci-store: the relational persistence layer for jobs, per-agent results,
//! and release decisions.
//!
//! [`SqliteStore`] is the only implementation today, but callers should
//! depend on the [`Store`] trait so a future Postgres-backed store can drop
//! in without touching the orchestrator or gateway.

pub mod error;
pub mod pool;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use pool::SqlitePool;
pub use store::{SqliteStore, Store};
