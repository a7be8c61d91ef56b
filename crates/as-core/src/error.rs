// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable wire-facing error taxonomy.
//!
//! Every other crate's local error type converts into one of these at its
//! boundary. `ErrorKind` never carries secret material in its `Display`.

use thiserror::Error;

/// Stable error kinds surfaced to callers or recorded in run rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("malformed invocation envelope: {0}")]
    BadEnvelope(String),

    #[error("no configured key could decrypt the envelope")]
    DecryptFailed,

    #[error("input does not conform to the action's input schema: {0}")]
    SchemaViolation(String),

    #[error("unknown package or action: {0}")]
    UnknownAction(String),

    #[error("bearer token missing or mismatched")]
    Unauthorized,

    #[error("process pool waiters saturated")]
    Overloaded,

    #[error("invalid run status transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("database schema version {found} is newer than this binary supports ({max})")]
    DbFromFuture { found: i64, max: i64 },

    #[error("data directory is locked by another process")]
    DataDirLocked,

    #[error("worker process crashed: {0}")]
    WorkerCrash(String),

    #[error("run cancelled")]
    CancellationAcknowledged,

    #[error("post-run hook failed: {0}")]
    HookFailed(String),
}

impl ErrorKind {
    /// Stable wire-kind string, independent of the (potentially detailed)
    /// `Display` message.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ErrorKind::BadEnvelope(_) => "BadEnvelope",
            ErrorKind::DecryptFailed => "DecryptFailed",
            ErrorKind::SchemaViolation(_) => "SchemaViolation",
            ErrorKind::UnknownAction(_) => "UnknownAction",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Overloaded => "Overloaded",
            ErrorKind::InvalidStateTransition { .. } => "InvalidStateTransition",
            ErrorKind::DbFromFuture { .. } => "DbFromFuture",
            ErrorKind::DataDirLocked => "DataDirLocked",
            ErrorKind::WorkerCrash(_) => "WorkerCrash",
            ErrorKind::CancellationAcknowledged => "CancellationAcknowledged",
            ErrorKind::HookFailed(_) => "HookFailed",
        }
    }

    /// Whether this error kind is surfaced synchronously to an HTTP caller
    /// (envelope/schema/auth errors) versus only ever observed via a run's
    /// terminal status (pool/worker/storage errors).
    pub fn is_synchronous(&self) -> bool {
        matches!(
            self,
            ErrorKind::BadEnvelope(_)
                | ErrorKind::DecryptFailed
                | ErrorKind::SchemaViolation(_)
                | ErrorKind::UnknownAction(_)
                | ErrorKind::Unauthorized
                | ErrorKind::Overloaded
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
