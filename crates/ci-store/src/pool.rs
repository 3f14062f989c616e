// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Connection pooling, on top of `r2d2` + `r2d2_sqlite`.
//!
//! `test_on_check_out` gives us the "pre-ping" behavior §4.2 of the spec
//! asks for: a borrowed connection is known-good (a plain `SELECT 1`)
//! before a caller ever issues a real query against it.

use crate::error::StoreError;
use crate::schema;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

/// Open (and migrate) a pooled SQLite store at `path`.
pub fn open(path: impl AsRef<Path>) -> Result<SqlitePool, StoreError> {
    build(SqliteConnectionManager::file(path.as_ref()))
}

/// Open an in-memory pooled store, for tests. Each connection in the pool
/// shares the same backing database via a named, shared-cache URI rather
/// than SQLite's private per-connection `:memory:` database, so that a
/// second pooled connection still sees what the first one wrote.
pub fn open_in_memory(name: &str) -> Result<SqlitePool, StoreError> {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    build(SqliteConnectionManager::file(uri).with_flags(
        rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_URI
            | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    ))
}

fn build(manager: SqliteConnectionManager) -> Result<SqlitePool, StoreError> {
    let manager = manager.with_init(schema::apply_pragmas);

    let pool = r2d2::Pool::builder()
        .max_size(8)
        .test_on_check_out(true)
        .connection_timeout(Duration::from_secs(10))
        .build(manager)?;

    let mut connection = pool.get()?;
    schema::initialize(&mut connection)?;
    Ok(pool)
}
