// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use as_core::ActionPackageId;
use as_storage::RunStore;

use super::*;

fn failing_builder() -> EnvironmentBuilderAdapter {
    EnvironmentBuilderAdapter::new(vec!["bash".into(), "-c".into(), "exit 1".into()])
}

fn write_manifest(dir: &std::path::Path, name: &str) {
    std::fs::write(dir.join(manifest::MANIFEST_FILE_NAME), format!("name: {name}\ndependencies:\n  python: \"3.10\"\n")).unwrap();
}

#[tokio::test]
async fn directory_without_manifest_is_silently_ignored() {
    let store = RunStore::open_in_memory().unwrap();
    let builder = failing_builder();
    let importer = Importer::new(&store, &builder);
    let dir = tempfile::tempdir().unwrap();

    let mut diagnostics = Vec::new();
    let result = importer.import_package(dir.path(), &mut diagnostics).await;
    assert!(matches!(result, Ok(None)));
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn malformed_manifest_is_a_package_level_diagnostic() {
    let store = RunStore::open_in_memory().unwrap();
    let builder = failing_builder();
    let importer = Importer::new(&store, &builder);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(manifest::MANIFEST_FILE_NAME), "name: [unterminated").unwrap();

    let mut diagnostics = Vec::new();
    let result = importer.import_package(dir.path(), &mut diagnostics).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn environment_build_failure_is_diagnosed_not_fatal() {
    let store = RunStore::open_in_memory().unwrap();
    let builder = failing_builder();
    let importer = Importer::new(&store, &builder);
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "Greeter");

    let mut diagnostics = Vec::new();
    let result = importer.import_package(dir.path(), &mut diagnostics).await;
    match result {
        Err(diag) => assert!(diag.message.contains("environment build failed")),
        Ok(_) => panic!("expected a diagnostic"),
    }
    // No rows should have been written for a package whose build failed.
    assert!(store.list_packages().unwrap().is_empty());
}

#[tokio::test]
async fn import_all_continues_past_a_failing_package() {
    let store = RunStore::open_in_memory().unwrap();
    let builder = failing_builder();
    let importer = Importer::new(&store, &builder);

    let root = tempfile::tempdir().unwrap();
    let bad = root.path().join("bad-pkg");
    std::fs::create_dir(&bad).unwrap();
    std::fs::write(bad.join(manifest::MANIFEST_FILE_NAME), "name: [unterminated").unwrap();

    let empty = root.path().join("no-manifest");
    std::fs::create_dir(&empty).unwrap();

    let (imported, diagnostics) = importer.import_all(root.path()).await;
    assert!(imported.is_empty());
    assert_eq!(diagnostics.len(), 1);
}

#[tokio::test]
async fn import_all_disables_a_package_whose_directory_is_gone() {
    let store = RunStore::open_in_memory().unwrap();
    let builder = failing_builder();
    let importer = Importer::new(&store, &builder);

    let stale = ActionPackage {
        id: ActionPackageId::new(),
        slug: "stale".to_string(),
        directory: std::path::PathBuf::from("/pkgs/stale"),
        manifest_hash: "deadbeef".to_string(),
        declared_endpoints: vec![],
        enabled: true,
    };
    store.upsert_package(&stale).unwrap();

    let root = tempfile::tempdir().unwrap();
    let (_imported, _diagnostics) = importer.import_all(root.path()).await;

    let reloaded = store.get_package_by_slug("stale").unwrap().unwrap();
    assert!(!reloaded.enabled);
}
