// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identity, status state machine, and the run counter.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::{ActionId, RunId};

/// Status of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    NotRun,
    Running,
    Pass,
    Fail,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        NotRun => "NOT_RUN",
        Running => "RUNNING",
        Pass => "PASS",
        Fail => "FAIL",
        Cancelled => "CANCELLED",
    }
}

impl RunStatus {
    /// Terminal statuses end a run's lifecycle; `finished_at` must be set.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Pass | RunStatus::Fail | RunStatus::Cancelled)
    }
}

/// Legal run-status transitions:
/// `NOT_RUN -> RUNNING | CANCELLED`, `RUNNING -> PASS | FAIL | CANCELLED`.
/// Any other pair is illegal and must be rejected with
/// `ErrorKind::InvalidStateTransition`.
pub fn can_transition(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    matches!(
        (from, to),
        (NotRun, Running) | (NotRun, Cancelled) | (Running, Pass) | (Running, Fail) | (Running, Cancelled)
    )
}

/// A single invocation of an action, persisted in the Run Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub action_id: ActionId,
    pub status: RunStatus,
    /// Monotonic per-(package, action) counter value, used for artifact
    /// directory naming.
    pub run_number: u64,
    /// Directory holding this run's artifacts, relative to the data
    /// directory's `runs/` root. `None` until the run is dispatched; a
    /// run cancelled before dispatch never gets one.
    pub artifact_dir: Option<PathBuf>,
    pub input_payload: serde_json::Value,
    pub result_payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// Client-supplied idempotency handle; unique per `(package, action)`.
    pub request_id: Option<String>,
    pub async_callback_url: Option<String>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
}

impl Run {
    /// Invariant (i): terminal status implies `finished_at` is set, and
    /// `started_at <= finished_at` whenever both are present.
    pub fn invariants_hold(&self) -> bool {
        if self.status.is_terminal() && self.finished_at_ms.is_none() {
            return false;
        }
        if let (Some(started), Some(finished)) = (self.started_at_ms, self.finished_at_ms) {
            if started > finished {
                return false;
            }
        }
        true
    }
}

/// A process-wide monotonic counter used to generate run numbers for
/// artifact directory naming, keyed per `(package, action)`.
#[derive(Debug, Default)]
pub struct Counter {
    values: HashMap<(String, String), u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next run number for this `(package, action)` pair,
    /// starting at 1.
    pub fn next(&mut self, package_slug: &str, action_slug: &str) -> u64 {
        let key = (package_slug.to_string(), action_slug.to_string());
        let entry = self.values.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
