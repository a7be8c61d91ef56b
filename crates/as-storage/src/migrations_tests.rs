// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn migrating_fresh_db_reaches_current_version() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrate(&mut conn).unwrap();
    let version: i64 =
        conn.query_row("SELECT version FROM schema_version WHERE id = 0", [], |row| row.get(0)).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn rerunning_migrations_is_a_noop() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrate(&mut conn).unwrap();
    migrate(&mut conn).unwrap();
    let version: i64 =
        conn.query_row("SELECT version FROM schema_version WHERE id = 0", [], |row| row.get(0)).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn future_schema_version_refuses_to_migrate() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE schema_version (id INTEGER PRIMARY KEY CHECK (id = 0), version INTEGER NOT NULL);
         INSERT INTO schema_version (id, version) VALUES (0, 999);",
    )
    .unwrap();
    let result = migrate(&mut conn);
    assert!(matches!(result, Err(StorageError::FromFuture { found: 999, max }) if max == CURRENT_SCHEMA_VERSION));
}
