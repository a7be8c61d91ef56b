// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment Builder Adapter: single-flight `ensure(env_key,
//! manifest)` over an opaque subprocess, with on-disk/in-memory result
//! caching.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use as_core::{Environment, EnvironmentId};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Notify;

use crate::error::PoolError;

/// JSON emitted on the builder subprocess's stdout describing the prepared
/// environment.
#[derive(Debug, Deserialize)]
struct BuilderOutput {
    location: PathBuf,
    worker_command: Vec<String>,
}

/// Single-flight adapter over an opaque environment-building subprocess.
/// Concurrent `ensure()` calls for the same `env_key` wait on one
/// in-progress build rather than racing duplicate subprocesses.
pub struct EnvironmentBuilderAdapter {
    builder_command: Vec<String>,
    cache: Mutex<HashMap<String, Environment>>,
    in_flight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl EnvironmentBuilderAdapter {
    pub fn new(builder_command: Vec<String>) -> Self {
        Self { builder_command, cache: Mutex::new(HashMap::new()), in_flight: Mutex::new(HashMap::new()) }
    }

    /// Resolve the prepared [`Environment`] for `env_key`, building it via
    /// the configured subprocess if it isn't already cached. Concurrent
    /// callers for the same key converge on one build.
    pub async fn ensure(&self, env_key: &str, manifest_dir: &Path) -> Result<Environment, PoolError> {
        loop {
            if let Some(env) = self.cache.lock().get(env_key).cloned() {
                return Ok(env);
            }

            let leader_or_waiter = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(env_key) {
                    Some(notify) => Err(notify.clone()),
                    None => {
                        in_flight.insert(env_key.to_string(), Arc::new(Notify::new()));
                        Ok(())
                    }
                }
            };

            match leader_or_waiter {
                Err(notify) => {
                    notify.notified().await;
                    continue;
                }
                Ok(()) => {
                    let result = self.build(env_key, manifest_dir).await;
                    if let Ok(ref env) = result {
                        self.cache.lock().insert(env_key.to_string(), env.clone());
                    }
                    let notify = self.in_flight.lock().remove(env_key);
                    if let Some(notify) = notify {
                        notify.notify_waiters();
                    }
                    return result;
                }
            }
        }
    }

    /// Update the last-used timestamp on a cached environment, so idle
    /// eviction and warm-pool bookkeeping have fresh data.
    pub fn touch(&self, env_key: &str) {
        if let Some(env) = self.cache.lock().get_mut(env_key) {
            env.last_used = Some(Instant::now());
        }
    }

    async fn build(&self, env_key: &str, manifest_dir: &Path) -> Result<Environment, PoolError> {
        let (program, args) = self
            .builder_command
            .split_first()
            .ok_or_else(|| PoolError::BuildFailed("empty builder command template".into()))?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .arg(manifest_dir)
            .arg(env_key)
            .output()
            .await
            .map_err(|e| PoolError::BuildFailed(format!("{program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(env_key, status = %output.status, stderr = %stderr, "environment build failed");
            return Err(PoolError::BuildFailed(format!(
                "builder exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let parsed: BuilderOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| PoolError::BuildFailed(format!("malformed builder output: {e}")))?;

        Ok(Environment {
            id: EnvironmentId::new(),
            env_key: env_key.to_string(),
            location: parsed.location,
            worker_command: parsed.worker_command,
            last_used: Some(Instant::now()),
        })
    }

    /// Remove build-tool scratch state without touching already-prepared
    /// environments.
    pub fn clean_caches(&self, scratch_dir: &Path) -> std::io::Result<()> {
        if scratch_dir.exists() {
            std::fs::remove_dir_all(scratch_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "env_builder_tests.rs"]
mod tests;
