// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-local lifecycle error; maps into `as_core::ErrorKind` at the
//! boundary the same way every other crate's error type does.

use as_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] as_storage::StorageError),

    #[error("pool error: {0}")]
    Pool(#[from] as_pool::PoolError),

    #[error("unknown package or action: {0}.{1}")]
    UnknownAction(String, String),

    #[error("required managed parameter {0:?} could not be resolved")]
    MissingManagedParam(String),

    #[error("{0}")]
    ManagedParam(ErrorKind),
}

impl EngineError {
    pub fn as_wire_kind(&self) -> ErrorKind {
        match self {
            EngineError::Storage(e) => e.as_wire_kind().unwrap_or(ErrorKind::WorkerCrash(e.to_string())),
            EngineError::Pool(e) => e.as_wire_kind(),
            EngineError::UnknownAction(package, action) => {
                ErrorKind::UnknownAction(format!("{package}.{action}"))
            }
            EngineError::MissingManagedParam(name) => {
                ErrorKind::BadEnvelope(format!("missing managed parameter {name:?}"))
            }
            EngineError::ManagedParam(kind) => kind.clone(),
        }
    }
}
