// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Action Catalog, Import Subsystem, and Reload Watcher: an immutable
//! snapshot-swap index of packages and actions, rebuilt from the run
//! store, kept current by a filesystem watch.

mod error;
mod import;
mod manifest;
mod snapshot;
mod watcher;

pub use error::CatalogError;
pub use import::{ImportDiagnostic, Importer};
pub use manifest::{environment_key, load_manifest, PackageManifest, MANIFEST_FILE_NAME};
pub use snapshot::{rebuild_snapshot, Catalog, CatalogFilters, CatalogSnapshot, PackageEntry};
pub use watcher::{ReloadWatcher, DEFAULT_DEBOUNCE};

/// Fail fast at startup if the configured packages root isn't usable,
/// rather than letting the first import run silently discover nothing.
pub fn validate_packages_root(path: &std::path::Path) -> Result<(), CatalogError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CatalogError::InvalidPackagesRoot(path.to_path_buf()))
    }
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn validate_packages_root_rejects_a_missing_directory() {
        let result = validate_packages_root(&std::path::PathBuf::from("/definitely/does/not/exist"));
        assert!(matches!(result, Err(CatalogError::InvalidPackagesRoot(_))));
    }

    #[test]
    fn validate_packages_root_accepts_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_packages_root(dir.path()).is_ok());
    }
}
