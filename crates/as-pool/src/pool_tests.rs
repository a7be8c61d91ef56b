// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::*;
use as_core::{EnvironmentId, RunId};

fn test_env(env_key: &str, command: &[&str]) -> Environment {
    Environment {
        id: EnvironmentId::new(),
        env_key: env_key.to_string(),
        location: PathBuf::from("/envs").join(env_key),
        worker_command: command.iter().map(|s| s.to_string()).collect(),
        last_used: Some(Instant::now()),
    }
}

fn test_request(run_id: RunId) -> WorkerRequest {
    WorkerRequest {
        run_id,
        action_qualified_name: "greeter.greet".to_string(),
        payload: serde_json::json!({}),
        managed_params: Default::default(),
        headers: Default::default(),
        artifact_dir: PathBuf::from("runs/1"),
    }
}

#[tokio::test]
async fn overloaded_waiters_are_rejected_immediately() {
    let config = PoolConfig { max_processes: 0, max_waiters: 0, ..PoolConfig::default() };
    let pool = Arc::new(Pool::new(config));
    let env = test_env("env-a", &["does-not-matter"]);
    let result = pool.submit(&env, test_request(RunId::new())).await;
    assert!(matches!(result, Err(PoolError::Overloaded)));
}

#[tokio::test]
async fn cancelling_a_queued_submission_resolves_it_as_cancelled() {
    let config = PoolConfig { max_processes: 0, max_waiters: 4, ..PoolConfig::default() };
    let pool = Arc::new(Pool::new(config));
    let env = test_env("env-b", &["does-not-matter"]);
    let run_id = RunId::new();

    let submit_pool = Arc::clone(&pool);
    let submit_env = env.clone();
    let handle = tokio::spawn(async move { submit_pool.submit(&submit_env, test_request(run_id)).await });

    // Give the submit task a chance to land on the waiters FIFO.
    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.cancel(run_id).await;

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PoolError::Cancelled)));
}

#[tokio::test]
async fn cancelling_an_unknown_run_is_a_noop() {
    let pool = Arc::new(Pool::new(PoolConfig::default()));
    pool.cancel(RunId::new()).await;
}

#[tokio::test]
async fn shutdown_cancels_queued_waiters() {
    let config = PoolConfig { max_processes: 0, max_waiters: 4, ..PoolConfig::default() };
    let pool = Arc::new(Pool::new(config));
    let env = test_env("env-c", &["does-not-matter"]);
    let run_id = RunId::new();

    let submit_pool = Arc::clone(&pool);
    let submit_env = env.clone();
    let handle = tokio::spawn(async move { submit_pool.submit(&submit_env, test_request(run_id)).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.shutdown(Duration::from_millis(0)).await;

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PoolError::Cancelled)));
}

#[tokio::test]
async fn submit_after_shutdown_is_refused() {
    let pool = Arc::new(Pool::new(PoolConfig::default()));
    pool.shutdown(Duration::from_millis(0)).await;
    let env = test_env("env-d", &["does-not-matter"]);
    let result = pool.submit(&env, test_request(RunId::new())).await;
    assert!(matches!(result, Err(PoolError::ShuttingDown)));
}

#[tokio::test]
async fn failed_spawn_surfaces_spawn_failed_and_frees_the_slot_count() {
    let config = PoolConfig { max_processes: 1, ..PoolConfig::default() };
    let pool = Arc::new(Pool::new(config));
    let env = test_env("env-e", &["/definitely/does/not/exist"]);

    let first = pool.submit(&env, test_request(RunId::new())).await;
    assert!(matches!(first, Err(PoolError::SpawnFailed(_))));

    // The failed spawn must have released its slot-count reservation, so a
    // second submission also gets a fresh spawn attempt instead of queueing
    // forever.
    let second = pool.submit(&env, test_request(RunId::new())).await;
    assert!(matches!(second, Err(PoolError::SpawnFailed(_))));
}
