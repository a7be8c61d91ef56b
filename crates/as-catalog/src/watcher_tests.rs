// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::*;

#[test]
fn watched_extensions_match_the_contract() {
    assert!(is_watched_file(&PathBuf::from("actions.py")));
    assert!(is_watched_file(&PathBuf::from("fast.pyx")));
    assert!(is_watched_file(&PathBuf::from("package.yaml")));
}

#[test]
fn unrelated_extensions_are_ignored() {
    assert!(!is_watched_file(&PathBuf::from("readme.md")));
    assert!(!is_watched_file(&PathBuf::from("notes.txt")));
    assert!(!is_watched_file(&PathBuf::from("no-extension")));
}
