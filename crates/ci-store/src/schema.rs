// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Schema initialization and pragmas.

use crate::error::StoreError;
use rusqlite::Connection;

const SCHEMA_VERSION: i64 = 1;

pub(crate) fn apply_pragmas(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch("PRAGMA journal_mode = WAL;")?;
    connection.execute_batch("PRAGMA synchronous = NORMAL;")?;
    connection.busy_timeout(std::time::Duration::from_millis(5_000))?;
    Ok(())
}

pub(crate) fn initialize(connection: &mut Connection) -> Result<(), StoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> =
        tx.query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0)).ok();

    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", [SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS jobs (
                    id TEXT PRIMARY KEY,
                    repo_name TEXT NOT NULL,
                    commit_hash TEXT NOT NULL,
                    commit_message TEXT NOT NULL,
                    branch TEXT NOT NULL,
                    author TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    completed_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_jobs_repo_commit
                    ON jobs (repo_name, commit_hash);

                CREATE TABLE IF NOT EXISTS agent_results (
                    job_id TEXT NOT NULL,
                    agent_name TEXT NOT NULL,
                    verdict TEXT NOT NULL,
                    confidence REAL NOT NULL,
                    payload TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (job_id, agent_name),
                    FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS release_decisions (
                    job_id TEXT PRIMARY KEY,
                    verdict TEXT NOT NULL,
                    score REAL NOT NULL,
                    explanation TEXT NOT NULL,
                    agent_results TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(StoreError::Corrupt(format!("unsupported schema version: {value}")));
        }
    }

    tx.commit()?;
    Ok(())
}
