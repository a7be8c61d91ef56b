// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn acquires_and_writes_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lock");
    let lock = DataDirLock::acquire(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
    drop(lock);
}

#[test]
fn second_acquire_fails_while_first_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lock");
    let _first = DataDirLock::acquire(&path).unwrap();
    assert!(matches!(DataDirLock::acquire(&path), Err(StorageError::Locked)));
}

#[test]
fn lock_releases_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lock");
    {
        let _first = DataDirLock::acquire(&path).unwrap();
    }
    assert!(DataDirLock::acquire(&path).is_ok());
}
