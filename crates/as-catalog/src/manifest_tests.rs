// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_manifest_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_manifest(dir.path()).unwrap().is_none());
}

#[test]
fn malformed_manifest_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "name: [unterminated").unwrap();
    assert!(load_manifest(dir.path()).is_err());
}

#[test]
fn parses_a_well_formed_manifest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(MANIFEST_FILE_NAME),
        "name: Greeter Package\ndependencies:\n  python: \"3.10\"\nendpoints:\n  - https://example.com\n",
    )
    .unwrap();
    let manifest = load_manifest(dir.path()).unwrap().unwrap();
    assert_eq!(manifest.name, "Greeter Package");
    assert_eq!(manifest.endpoints, vec!["https://example.com".to_string()]);
}

#[test]
fn environment_key_is_stable_and_ignores_unrelated_fields() {
    let a = PackageManifest {
        name: "a".into(),
        description: "one".into(),
        dependencies: serde_yaml::from_str("python: \"3.10\"").unwrap(),
        endpoints: vec![],
    };
    let b = PackageManifest { description: "two".into(), ..a.clone() };
    assert_eq!(environment_key(&a), environment_key(&b));
}

#[test]
fn environment_key_changes_with_dependencies() {
    let a = PackageManifest {
        name: "a".into(),
        description: String::new(),
        dependencies: serde_yaml::from_str("python: \"3.10\"").unwrap(),
        endpoints: vec![],
    };
    let b = PackageManifest { dependencies: serde_yaml::from_str("python: \"3.11\"").unwrap(), ..a.clone() };
    assert_ne!(environment_key(&a), environment_key(&b));
}
