// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Process bootstrapping shared by every subcommand: tracing init and the
//! ST/MB handles each component wires into its service type.

use crate::error::CliError;
use ci_bus::{MemoryBus, MessageBus};
use ci_store::{pool, SqliteStore, Store};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a `tracing-subscriber` formatter honoring `RUST_LOG`, falling
/// back to `info` when it's unset or unparsable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// `database_url` carries an optional `sqlite://` scheme (§6); `rusqlite`
/// wants a bare filesystem path.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url.strip_prefix("sqlite://").unwrap_or(database_url)
}

pub fn build_store(database_url: &str) -> Result<Arc<dyn Store>, CliError> {
    let pool = pool::open(sqlite_path(database_url))?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

/// Every subcommand that isn't `run-all` gets its own private bus: there
/// is no durable `MessageBus` implementation in this workspace yet (§1's
/// note that a Redis Streams-backed one would implement the same trait),
/// so a component started as a standalone OS process cannot presently
/// exchange events with another one. `run-all` is the supported way to
/// exercise the full pipeline until that backend lands.
pub fn build_bus() -> Arc<dyn MessageBus> {
    Arc::new(MemoryBus::new())
}
