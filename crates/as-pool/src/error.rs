// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process pool and environment builder errors.

use as_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(String),

    #[error("worker protocol error: {0}")]
    Protocol(#[from] as_wire::ProtocolError),

    #[error("worker crashed: {0}")]
    WorkerCrash(String),

    #[error("environment build failed: {0}")]
    BuildFailed(String),

    #[error("process pool waiters saturated")]
    Overloaded,

    #[error("run was cancelled")]
    Cancelled,

    #[error("pool is shutting down")]
    ShuttingDown,
}

impl PoolError {
    pub fn as_wire_kind(&self) -> ErrorKind {
        match self {
            PoolError::Overloaded => ErrorKind::Overloaded,
            PoolError::Cancelled => ErrorKind::CancellationAcknowledged,
            PoolError::SpawnFailed(msg)
            | PoolError::BuildFailed(msg) => ErrorKind::WorkerCrash(msg.clone()),
            PoolError::WorkerCrash(msg) => ErrorKind::WorkerCrash(msg.clone()),
            PoolError::Protocol(e) => ErrorKind::WorkerCrash(e.to_string()),
            PoolError::ShuttingDown => ErrorKind::Overloaded,
        }
    }
}
