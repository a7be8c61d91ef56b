// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server lifecycle: startup composition root. Mirrors the
//! lock-before-anything-else ordering used by long-running daemons in
//! this codebase's lineage, adapted to the store/catalog/pool/bus/engine
//! stack this server composes.

mod startup;

pub use startup::startup;

use thiserror::Error;

use crate::state::AppState;

/// Everything `main` needs after a successful startup: the state to hand
/// to the router, plus the bound listener (bound last, once every other
/// validation has passed).
pub struct StartupResult {
    pub state: AppState,
    pub listener: tokio::net::TcpListener,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("storage error: {0}")]
    Storage(#[from] as_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] as_catalog::CatalogError),

    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("decrypt keys: {0}")]
    DecryptKeys(#[from] as_core::ErrorKind),

    #[error("failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),
}
