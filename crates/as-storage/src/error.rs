// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-local storage error; maps into `as_core::ErrorKind` only where the
//! two taxonomies actually correspond (mirrors how `LifecycleError` wraps
//! `WalError`/`SnapshotError` without exposing them directly).

use as_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("data directory is locked by another process")]
    Locked,

    #[error("database schema version {found} is newer than this binary supports (max {max})")]
    FromFuture { found: i64, max: i64 },

    #[error("invalid run status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl StorageError {
    /// Whether this is the `run_request_id_idx` unique-index violation
    /// `create_run` can hit when two submissions for the same
    /// `(package_slug, action_slug, request_id)` race each other.
    pub fn is_duplicate_request_id(&self) -> bool {
        matches!(
            self,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    /// The subset of storage failures that also have a stable wire-kind;
    /// IO/sqlite plumbing failures are server-internal and never reach a
    /// caller as a typed `ErrorKind`.
    pub fn as_wire_kind(&self) -> Option<ErrorKind> {
        match self {
            StorageError::Locked => Some(ErrorKind::DataDirLocked),
            StorageError::FromFuture { found, max } => {
                Some(ErrorKind::DbFromFuture { found: *found, max: *max })
            }
            StorageError::InvalidTransition { from, to } => {
                Some(ErrorKind::InvalidStateTransition { from: from.clone(), to: to.clone() })
            }
            StorageError::Io(_) | StorageError::Sqlite(_) => None,
        }
    }
}
