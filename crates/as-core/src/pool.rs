// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment and worker-slot domain types shared between `as-pool` and
//! `as-catalog`: `Environment`, `WorkerSlot`.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::id::EnvironmentId;

/// An isolated runtime prepared for a package's dependencies, keyed by a
/// content hash of the manifest. Owned by the Environment Builder Adapter;
/// referenced (not owned) by the Process Pool.
#[derive(Debug, Clone)]
pub struct Environment {
    pub id: EnvironmentId,
    /// Content hash of the manifest's environment-relevant fields.
    pub env_key: String,
    pub location: PathBuf,
    /// Command template used to launch a worker process in this environment.
    pub worker_command: Vec<String>,
    pub last_used: Option<Instant>,
}

/// Opaque handle naming a [`WorkerSlot`] without exposing the pool's
/// internal arena, breaking the worker<->pool cyclic reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerSlotId(pub u64);

/// The three mutually exclusive states a worker slot can be in at any
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSlotState {
    Idle,
    Busy,
    /// Set when the worker crashed, misbehaved, or returned a malformed
    /// frame. A poisoned slot is never reused.
    Poisoned,
}

crate::simple_display! {
    WorkerSlotState {
        Idle => "idle",
        Busy => "busy",
        Poisoned => "poisoned",
    }
}

impl WorkerSlotState {
    pub fn is_reusable(self) -> bool {
        matches!(self, WorkerSlotState::Idle)
    }
}
