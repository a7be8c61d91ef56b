// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fatal catalog errors. Per-package/per-action import failures are never
//! fatal — they accumulate as [`crate::import::ImportDiagnostic`]s instead
//! ("record the diagnostic and skip this package").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Storage(#[from] as_storage::StorageError),

    #[error("packages root {0} does not exist or is not a directory")]
    InvalidPackagesRoot(std::path::PathBuf),

    #[error("filesystem watch failed: {0}")]
    Watch(#[from] notify::Error),
}
