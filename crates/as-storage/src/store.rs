// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Run Store: package/action rows, runs, the per-action
//! counter, and cursored run queries. Writes serialize behind a single
//! writer lane (a `parking_lot::Mutex` around the connection, the same
//! shape as the WAL mutex this crate replaces); reads share the lane too
//! since `rusqlite::Connection` isn't `Sync` on its own, but SQLite's own
//! locking means this is never a bottleneck in practice.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use as_core::{Action, ActionId, ActionPackage, ActionPackageId, ManagedParamKind, Run, RunId, RunStatus, can_transition};

use crate::error::StorageError;
use crate::migrations;

pub struct RunStore {
    conn: Mutex<Connection>,
}

/// Filters accepted by [`RunStore::cursor_query`].
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub package_slug: Option<String>,
    pub action_slug: Option<String>,
}

/// One page of a cursored run listing, ordered by creation time then id.
#[derive(Debug, Clone)]
pub struct RunPage {
    pub runs: Vec<Run>,
    pub next_cursor: Option<String>,
}

fn row_to_package(row: &Row) -> rusqlite::Result<ActionPackage> {
    let id: String = row.get("id")?;
    let declared_endpoints: String = row.get("declared_endpoints")?;
    Ok(ActionPackage {
        id: ActionPackageId::from_string(id),
        slug: row.get("slug")?,
        directory: PathBuf::from(row.get::<_, String>("directory")?),
        manifest_hash: row.get("manifest_hash")?,
        declared_endpoints: serde_json::from_str(&declared_endpoints).unwrap_or_default(),
        enabled: row.get::<_, i64>("enabled")? != 0,
    })
}

fn row_to_action(row: &Row) -> rusqlite::Result<(Action, bool)> {
    let managed_params: String = row.get("managed_params")?;
    let tool_kind: String = row.get("tool_kind")?;
    let action = Action {
        id: ActionId::from_string(row.get::<_, String>("id")?),
        package_id: ActionPackageId::from_string(row.get::<_, String>("package_id")?),
        slug: row.get("slug")?,
        display_name: row.get("display_name")?,
        input_schema: serde_json::from_str(&row.get::<_, String>("input_schema")?).unwrap_or(serde_json::Value::Null),
        output_schema: serde_json::from_str(&row.get::<_, String>("output_schema")?).unwrap_or(serde_json::Value::Null),
        managed_params: serde_json::from_str::<std::collections::HashMap<String, ManagedParamKind>>(&managed_params)
            .unwrap_or_default(),
        consequential: row.get::<_, i64>("consequential")? != 0,
        source_file: PathBuf::from(row.get::<_, String>("source_file")?),
        source_line: row.get::<_, i64>("source_line")? as u32,
        tool_kind: serde_json::from_str(&tool_kind).unwrap_or(as_core::ToolKind::Action),
    };
    Ok((action, row.get::<_, i64>("enabled")? != 0))
}

fn row_to_run(row: &Row) -> rusqlite::Result<Run> {
    let status: String = row.get("status")?;
    let artifact_dir: Option<String> = row.get("artifact_dir")?;
    let result_payload: Option<String> = row.get("result_payload")?;
    Ok(Run {
        id: RunId::from_string(row.get::<_, String>("id")?),
        action_id: ActionId::from_string(row.get::<_, String>("action_id")?),
        status: serde_json::from_str(&status).unwrap_or(RunStatus::NotRun),
        run_number: row.get::<_, i64>("run_number")? as u64,
        artifact_dir: artifact_dir.map(PathBuf::from),
        input_payload: serde_json::from_str(&row.get::<_, String>("input_payload")?).unwrap_or(serde_json::Value::Null),
        result_payload: result_payload.and_then(|p| serde_json::from_str(&p).ok()),
        error_message: row.get("error_message")?,
        request_id: row.get("request_id")?,
        async_callback_url: row.get("async_callback_url")?,
        created_at_ms: row.get::<_, i64>("created_at_ms")? as u64,
        started_at_ms: row.get::<_, Option<i64>>("started_at_ms")?.map(|v| v as u64),
        finished_at_ms: row.get::<_, Option<i64>>("finished_at_ms")?.map(|v| v as u64),
    })
}

impl RunStore {
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // -- package / action CRUD -----------------------

    pub fn upsert_package(&self, pkg: &ActionPackage) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO action_package (id, slug, directory, manifest_hash, declared_endpoints, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(slug) DO UPDATE SET
                id = excluded.id,
                directory = excluded.directory,
                manifest_hash = excluded.manifest_hash,
                declared_endpoints = excluded.declared_endpoints,
                enabled = excluded.enabled",
            params![
                pkg.id.as_str(),
                pkg.slug,
                pkg.directory.to_string_lossy(),
                pkg.manifest_hash,
                serde_json::to_string(&pkg.declared_endpoints).unwrap_or_default(),
                pkg.enabled as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_package_by_slug(&self, slug: &str) -> Result<Option<ActionPackage>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM action_package WHERE slug = ?1", params![slug], row_to_package)
            .optional()
            .map_err(StorageError::from)
    }

    pub fn list_packages(&self) -> Result<Vec<ActionPackage>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM action_package ORDER BY slug")?;
        let rows = stmt.query_map([], row_to_package)?;
        rows.collect::<Result<_, _>>().map_err(StorageError::from)
    }

    /// Replace a package's action rows transactionally: upsert every action
    /// in `actions`, then mark as disabled any existing row for this
    /// package not present in the new set ("insert new,
    /// mark obsolete as disabled").
    pub fn replace_package_actions(&self, package_id: &ActionPackageId, actions: &[Action]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for action in actions {
            tx.execute(
                "INSERT INTO action (id, package_id, slug, display_name, input_schema, output_schema,
                                      managed_params, consequential, source_file, source_line, tool_kind, enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1)
                 ON CONFLICT(package_id, slug) DO UPDATE SET
                    id = excluded.id,
                    display_name = excluded.display_name,
                    input_schema = excluded.input_schema,
                    output_schema = excluded.output_schema,
                    managed_params = excluded.managed_params,
                    consequential = excluded.consequential,
                    source_file = excluded.source_file,
                    source_line = excluded.source_line,
                    tool_kind = excluded.tool_kind,
                    enabled = 1",
                params![
                    action.id.as_str(),
                    package_id.as_str(),
                    action.slug,
                    action.display_name,
                    serde_json::to_string(&action.input_schema).unwrap_or_default(),
                    serde_json::to_string(&action.output_schema).unwrap_or_default(),
                    serde_json::to_string(&action.managed_params).unwrap_or_default(),
                    action.consequential as i64,
                    action.source_file.to_string_lossy(),
                    action.source_line,
                    serde_json::to_string(&action.tool_kind).unwrap_or_default(),
                ],
            )?;
        }

        let kept_slugs: Vec<String> = actions.iter().map(|a| a.slug.clone()).collect();
        let placeholders = kept_slugs.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("UPDATE action SET enabled = 0 WHERE package_id = ? AND slug NOT IN ({placeholders})");
        let mut bind_values: Vec<String> = Vec::with_capacity(kept_slugs.len() + 1);
        bind_values.push(package_id.as_str().to_string());
        bind_values.extend(kept_slugs);
        tx.execute(&sql, rusqlite::params_from_iter(bind_values))?;

        tx.commit()?;
        Ok(())
    }

    pub fn find_enabled_action(&self, package_slug: &str, action_slug: &str) -> Result<Option<Action>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT a.* FROM action a
             JOIN action_package p ON p.id = a.package_id
             WHERE p.slug = ?1 AND a.slug = ?2 AND a.enabled = 1 AND p.enabled = 1",
            params![package_slug, action_slug],
            |row| row_to_action(row).map(|(action, _)| action),
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn list_enabled_actions_for_package(&self, package_id: &ActionPackageId) -> Result<Vec<Action>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM action WHERE package_id = ?1 AND enabled = 1 ORDER BY slug")?;
        let rows = stmt.query_map(params![package_id.as_str()], |row| row_to_action(row).map(|(a, _)| a))?;
        rows.collect::<Result<_, _>>().map_err(StorageError::from)
    }

    // -- runs -------------------------------------------------------------

    /// Create a `NOT_RUN` row, assigning the next counter value for this
    /// `(package_slug, action_slug)` pair. `artifact_dir` starts `None`;
    /// it's filled in on dispatch, not here.
    #[allow(clippy::too_many_arguments)]
    pub fn create_run(
        &self,
        id: RunId,
        action_id: &ActionId,
        package_slug: &str,
        action_slug: &str,
        input_payload: &serde_json::Value,
        request_id: Option<&str>,
        async_callback_url: Option<&str>,
        now_ms: u64,
    ) -> Result<Run, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO counter (package_slug, action_slug, value) VALUES (?1, ?2, 1)
             ON CONFLICT(package_slug, action_slug) DO UPDATE SET value = value + 1",
            params![package_slug, action_slug],
        )?;
        let run_number: i64 = tx.query_row(
            "SELECT value FROM counter WHERE package_slug = ?1 AND action_slug = ?2",
            params![package_slug, action_slug],
            |row| row.get(0),
        )?;

        let status = serde_json::to_string(&RunStatus::NotRun).unwrap_or_default();
        tx.execute(
            "INSERT INTO run (id, action_id, package_slug, action_slug, status, run_number, artifact_dir,
                               input_payload, result_payload, error_message, request_id, async_callback_url,
                               created_at_ms, started_at_ms, finished_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, NULL, NULL, ?8, ?9, ?10, NULL, NULL)",
            params![
                id.as_str(),
                action_id.as_str(),
                package_slug,
                action_slug,
                status,
                run_number,
                serde_json::to_string(input_payload).unwrap_or_default(),
                request_id,
                async_callback_url,
                now_ms as i64,
            ],
        )?;
        tx.commit()?;

        Ok(Run {
            id,
            action_id: action_id.clone(),
            status: RunStatus::NotRun,
            run_number: run_number as u64,
            artifact_dir: None,
            input_payload: input_payload.clone(),
            result_payload: None,
            error_message: None,
            request_id: request_id.map(str::to_string),
            async_callback_url: async_callback_url.map(str::to_string),
            created_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
        })
    }

    pub fn get_run(&self, id: &RunId) -> Result<Option<Run>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM run WHERE id = ?1", params![id.as_str()], row_to_run)
            .optional()
            .map_err(StorageError::from)
    }

    pub fn find_run_by_request_id(
        &self,
        package_slug: &str,
        action_slug: &str,
        request_id: &str,
    ) -> Result<Option<Run>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM run WHERE package_slug = ?1 AND action_slug = ?2 AND request_id = ?3",
            params![package_slug, action_slug, request_id],
            row_to_run,
        )
        .optional()
        .map_err(StorageError::from)
    }

    /// Set the artifact directory and move a run to `RUNNING` (the only
    /// transition that also assigns `artifact_dir` and `started_at_ms`).
    pub fn mark_dispatched(&self, id: &RunId, artifact_dir: &Path, now_ms: u64) -> Result<(), StorageError> {
        self.transition(id, RunStatus::Running, |tx| {
            tx.execute(
                "UPDATE run SET artifact_dir = ?1, started_at_ms = ?2 WHERE id = ?3",
                params![artifact_dir.to_string_lossy(), now_ms as i64, id.as_str()],
            )?;
            Ok(())
        })
    }

    /// Move a run to a terminal status, recording the result/error and
    /// `finished_at_ms`. Enforces [`can_transition`].
    pub fn finish(
        &self,
        id: &RunId,
        to: RunStatus,
        result_payload: Option<&serde_json::Value>,
        error_message: Option<&str>,
        now_ms: u64,
    ) -> Result<(), StorageError> {
        self.transition(id, to, |tx| {
            tx.execute(
                "UPDATE run SET result_payload = ?1, error_message = ?2, finished_at_ms = ?3 WHERE id = ?4",
                params![
                    result_payload.map(|v| serde_json::to_string(v).unwrap_or_default()),
                    error_message,
                    now_ms as i64,
                    id.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    fn transition(
        &self,
        id: &RunId,
        to: RunStatus,
        apply: impl FnOnce(&rusqlite::Transaction) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let current_status: String =
            tx.query_row("SELECT status FROM run WHERE id = ?1", params![id.as_str()], |row| row.get(0))?;
        let from: RunStatus = serde_json::from_str(&current_status).unwrap_or(RunStatus::NotRun);
        if !can_transition(from, to) {
            return Err(StorageError::InvalidTransition { from: from.to_string(), to: to.to_string() });
        }
        tx.execute(
            "UPDATE run SET status = ?1 WHERE id = ?2",
            params![serde_json::to_string(&to).unwrap_or_default(), id.as_str()],
        )?;
        apply(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Reset every non-terminal run to `CANCELLED` (executed exactly once
    /// at server boot).
    pub fn reset_non_terminal_to_cancelled(&self, now_ms: u64) -> Result<usize, StorageError> {
        let conn = self.conn.lock();
        let not_run = serde_json::to_string(&RunStatus::NotRun).unwrap_or_default();
        let running = serde_json::to_string(&RunStatus::Running).unwrap_or_default();
        let cancelled = serde_json::to_string(&RunStatus::Cancelled).unwrap_or_default();
        let count = conn.execute(
            "UPDATE run SET status = ?1, finished_at_ms = COALESCE(finished_at_ms, ?2)
             WHERE status IN (?3, ?4)",
            params![cancelled, now_ms as i64, not_run, running],
        )?;
        Ok(count)
    }

    /// Stable-ordered, cursored run listing ("stable ordering by
    /// creation time then id").
    pub fn cursor_query(&self, filter: &RunFilter, page_size: usize, page_after: Option<&str>) -> Result<RunPage, StorageError> {
        let conn = self.conn.lock();
        let mut sql = String::from("SELECT * FROM run WHERE 1 = 1");
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            bind.push(Box::new(serde_json::to_string(&status).unwrap_or_default()));
        }
        if let Some(package_slug) = &filter.package_slug {
            sql.push_str(" AND package_slug = ?");
            bind.push(Box::new(package_slug.clone()));
        }
        if let Some(action_slug) = &filter.action_slug {
            sql.push_str(" AND action_slug = ?");
            bind.push(Box::new(action_slug.clone()));
        }
        if let Some(cursor) = page_after {
            let (created_at_ms, id) = decode_cursor(cursor)?;
            sql.push_str(" AND (created_at_ms, id) > (?, ?)");
            bind.push(Box::new(created_at_ms));
            bind.push(Box::new(id));
        }
        sql.push_str(" ORDER BY created_at_ms, id LIMIT ?");
        bind.push(Box::new((page_size + 1) as i64));

        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|b| b.as_ref()).collect();
        let mut runs: Vec<Run> = stmt.query_map(params_ref.as_slice(), row_to_run)?.collect::<Result<_, _>>()?;

        let next_cursor = if runs.len() > page_size {
            runs.truncate(page_size);
            runs.last().map(|r| encode_cursor(r.created_at_ms, r.id.as_str()))
        } else {
            None
        };

        Ok(RunPage { runs, next_cursor })
    }
}

fn encode_cursor(created_at_ms: u64, id: &str) -> String {
    format!("{created_at_ms}:{id}")
}

fn decode_cursor(cursor: &str) -> Result<(i64, String), StorageError> {
    let malformed = || {
        StorageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("malformed cursor: {cursor}")))
    };
    let (ms, id) = cursor.split_once(':').ok_or_else(malformed)?;
    let ms: i64 = ms.parse().map_err(|_| malformed())?;
    Ok((ms, id.to_string()))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
