// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state passed to every API handler.

use std::sync::Arc;

use as_bus::Bus;
use as_catalog::{Catalog, ReloadWatcher};
use as_core::SystemClock;
use as_envelope::DecryptKeys;
use as_engine::LifecycleManager;
use as_storage::DataDirLock;

use crate::config::Config;

/// Shared application state. Cheap to clone (every field is an `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<LifecycleManager<SystemClock>>,
    pub catalog: Arc<Catalog>,
    pub bus: Arc<Bus>,
    pub decrypt_keys: Arc<DecryptKeys>,
    /// SHA-256 digest of the configured API token; `None` means auth is
    /// disabled (dev mode).
    pub api_token_hash: Option<Arc<[u8]>>,
    /// Held only to keep the data-directory lock and the package reload
    /// watch alive for as long as any clone of this state exists.
    pub(crate) _lock: Arc<DataDirLock>,
    pub(crate) _watcher: Arc<ReloadWatcher>,
}
