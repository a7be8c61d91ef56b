// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file lock over the data directory, held for the process
//! lifetime. Copied from the daemon's lock-acquire-before-
//! anything-else startup ordering: the lock is taken before any other
//! directory is created or touched, so a failed acquire never triggers
//! cleanup of a sibling process's files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::error::StorageError;

/// Held for as long as the server runs; the lock releases when this value
/// is dropped.
pub struct DataDirLock {
    _file: File,
}

impl DataDirLock {
    /// Acquire the exclusive lock at `lock_path`, writing this process's
    /// PID. Returns [`StorageError::Locked`] if another process already
    /// holds it.
    pub fn acquire(lock_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open without truncating before the lock is held, so a failed
        // acquire never wipes the running process's PID.
        let file = OpenOptions::new().write(true).create(true).truncate(false).open(lock_path)?;
        file.try_lock_exclusive().map_err(|_| StorageError::Locked)?;

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
