// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker protocol messages: the wire contract with workers.

use std::collections::HashMap;
use std::path::PathBuf;

use as_core::{ManagedParamKind, RunId, ToolKind};
use serde::{Deserialize, Serialize};

/// One action discovered by a transient enumerate-mode worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAction {
    pub slug: String,
    pub display_name: String,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    #[serde(default)]
    pub managed_params: HashMap<String, ManagedParamKind>,
    pub consequential: bool,
    pub source_file: PathBuf,
    pub source_line: u32,
    pub tool_kind: ToolKind,
}

/// A resolved managed parameter value handed to the worker for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedParamValue {
    pub kind: ManagedParamKind,
    pub value: serde_json::Value,
}

/// Outcome of a single call, as reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunOutcome {
    Pass,
    Fail,
}

/// Every message kind exchanged over a worker's dedicated channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Message {
    /// Sent by a freshly spawned worker once it has finished importing and
    /// can accept requests.
    Ready,

    /// One action invocation.
    Request {
        run_id: RunId,
        /// Fully qualified within the worker's loaded packages
        /// (`<package_slug>.<action_slug>`).
        action_qualified_name: String,
        payload: serde_json::Value,
        #[serde(default)]
        managed_params: HashMap<String, ManagedParamValue>,
        #[serde(default)]
        headers: HashMap<String, String>,
        artifact_dir: PathBuf,
    },

    /// The worker's response to a `Request`.
    Result {
        run_id: RunId,
        status: RunOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Paths to captured stdout/stderr and a structured trace artifact,
        /// relative to `artifact_dir`.
        #[serde(default)]
        stdout_path: Option<PathBuf>,
        #[serde(default)]
        stderr_path: Option<PathBuf>,
        #[serde(default)]
        trace_path: Option<PathBuf>,
    },

    /// Sent to a transient worker started in enumerate mode: import every
    /// action module and report what was found, then exit without waiting
    /// for `Request`s.
    Enumerate,

    /// The enumerate-mode worker's reply to `Enumerate`.
    Actions { actions: Vec<DiscoveredAction> },

    /// Liveness probe; the worker must answer with `Pong`.
    Ping,
    Pong,

    /// Cooperative cancellation of the worker's current run. On receipt the
    /// worker attempts interruption and, failing that, exits; an exit
    /// during a run is treated by the pool as a `FAIL` with "worker
    /// terminated".
    Cancel { run_id: RunId },

    /// Graceful shutdown request.
    Shutdown,
}
