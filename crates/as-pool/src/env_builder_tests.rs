// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::Arc;

use super::*;

fn echo_builder_command(location: &str, worker_command: &str) -> Vec<String> {
    let payload = format!(
        r#"{{"location":"{location}","worker_command":["{worker_command}"]}}"#
    );
    vec!["bash".into(), "-c".into(), format!("printf '%s' '{payload}'"), "_".into()]
}

#[tokio::test]
async fn ensure_builds_and_caches_environment() {
    let adapter = EnvironmentBuilderAdapter::new(echo_builder_command("/tmp/env-a", "worker"));
    let env = adapter.ensure("env-a", &PathBuf::from("/pkgs/a")).await.unwrap();
    assert_eq!(env.env_key, "env-a");
    assert_eq!(env.location, PathBuf::from("/tmp/env-a"));

    // Second call hits the cache; no new subprocess is spawned (can't
    // observe directly, but the cached value must be identical).
    let again = adapter.ensure("env-a", &PathBuf::from("/pkgs/a")).await.unwrap();
    assert_eq!(again.id, env.id);
}

#[tokio::test]
async fn concurrent_ensure_calls_for_same_key_converge() {
    let adapter = Arc::new(EnvironmentBuilderAdapter::new(echo_builder_command("/tmp/env-b", "worker")));
    let a = adapter.clone();
    let b = adapter.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.ensure("env-b", &PathBuf::from("/pkgs/b")).await }),
        tokio::spawn(async move { b.ensure("env-b", &PathBuf::from("/pkgs/b")).await }),
    );
    let env_a = ra.unwrap().unwrap();
    let env_b = rb.unwrap().unwrap();
    assert_eq!(env_a.id, env_b.id);
}

#[tokio::test]
async fn failing_builder_surfaces_build_failed() {
    let adapter =
        EnvironmentBuilderAdapter::new(vec!["bash".into(), "-c".into(), "exit 1".into()]);
    let result = adapter.ensure("env-c", &PathBuf::from("/pkgs/c")).await;
    assert!(matches!(result, Err(PoolError::BuildFailed(_))));
}

#[tokio::test]
async fn empty_builder_command_is_rejected() {
    let adapter = EnvironmentBuilderAdapter::new(vec![]);
    let result = adapter.ensure("env-d", &PathBuf::from("/pkgs/d")).await;
    assert!(matches!(result, Err(PoolError::BuildFailed(_))));
}
