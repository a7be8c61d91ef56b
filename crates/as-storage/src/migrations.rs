// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, idempotent, versioned migrations. Each entry is
//! applied inside one transaction; a recorded version higher than
//! [`CURRENT_SCHEMA_VERSION`] refuses startup with
//! [`StorageError::FromFuture`] before any other migration runs.

use rusqlite::Connection;

use crate::error::StorageError;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const MIGRATION_0001: &str = r#"
CREATE TABLE IF NOT EXISTS action_package (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    directory TEXT NOT NULL,
    manifest_hash TEXT NOT NULL,
    declared_endpoints TEXT NOT NULL,
    enabled INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS action (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL REFERENCES action_package(id),
    slug TEXT NOT NULL,
    display_name TEXT NOT NULL,
    input_schema TEXT NOT NULL,
    output_schema TEXT NOT NULL,
    managed_params TEXT NOT NULL,
    consequential INTEGER NOT NULL,
    source_file TEXT NOT NULL,
    source_line INTEGER NOT NULL,
    tool_kind TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE(package_id, slug)
);

CREATE TABLE IF NOT EXISTS run (
    id TEXT PRIMARY KEY,
    action_id TEXT NOT NULL REFERENCES action(id),
    package_slug TEXT NOT NULL,
    action_slug TEXT NOT NULL,
    status TEXT NOT NULL,
    run_number INTEGER NOT NULL,
    artifact_dir TEXT,
    input_payload TEXT NOT NULL,
    result_payload TEXT,
    error_message TEXT,
    request_id TEXT,
    async_callback_url TEXT,
    created_at_ms INTEGER NOT NULL,
    started_at_ms INTEGER,
    finished_at_ms INTEGER
);

CREATE INDEX IF NOT EXISTS run_created_at_idx ON run(created_at_ms, id);
CREATE INDEX IF NOT EXISTS run_package_action_idx ON run(package_slug, action_slug);
CREATE UNIQUE INDEX IF NOT EXISTS run_request_id_idx
    ON run(package_slug, action_slug, request_id)
    WHERE request_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS counter (
    package_slug TEXT NOT NULL,
    action_slug TEXT NOT NULL,
    value INTEGER NOT NULL,
    PRIMARY KEY (package_slug, action_slug)
);
"#;

const MIGRATIONS: &[&str] = &[MIGRATION_0001];

/// Apply every migration up to [`CURRENT_SCHEMA_VERSION`]. A no-op when the
/// database is already current, since every statement is `IF NOT EXISTS`.
pub fn migrate(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (id INTEGER PRIMARY KEY CHECK (id = 0), version INTEGER NOT NULL);
         INSERT OR IGNORE INTO schema_version (id, version) VALUES (0, 0);",
    )?;

    let found: i64 =
        conn.query_row("SELECT version FROM schema_version WHERE id = 0", [], |row| row.get(0))?;
    if found > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::FromFuture { found, max: CURRENT_SCHEMA_VERSION });
    }

    let tx = conn.transaction()?;
    for statement in MIGRATIONS {
        tx.execute_batch(statement)?;
    }
    tx.execute("UPDATE schema_version SET version = ?1 WHERE id = 0", [CURRENT_SCHEMA_VERSION])?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
#[path = "migrations_tests.rs"]
mod tests;
