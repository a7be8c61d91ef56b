// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access and on-disk layout for the
//! server binary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a home directory; set ACTION_SERVER_HOME")]
    NoHomeDir,

    #[error("ACTION_SERVER_DECRYPT_KEYS is not a JSON array of strings: {0}")]
    BadDecryptKeys(serde_json::Error),
}

/// Resolved server configuration: on-disk layout plus the handful of
/// environment-variable knobs spec.md names explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory (lock file, database, runs/ tree, package cache).
    pub home: PathBuf,
    pub lock_path: PathBuf,
    pub db_path: PathBuf,
    pub runs_path: PathBuf,
    pub packages_root: PathBuf,

    pub bind_addr: String,
    pub api_token: Option<String>,
    /// Argv template for the opaque environment-building subprocess; the
    /// adapter appends `<manifest_dir> <env_key>`.
    pub builder_cmd: Vec<String>,

    /// JSON array of base64 AEAD keys, newest-first.
    pub decrypt_keys_json: Option<String>,
    /// Disables version self-checks and hints the environment builder to
    /// skip host-specific optimizations.
    pub container_mode: bool,
    /// `$name`-substitution command template run after every terminal run.
    pub post_run_cmd: Option<String>,
    /// When set, the server exits once this pid is no longer alive.
    pub parent_pid: Option<i32>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let home = home_dir()?;
        let packages_root = std::env::var("ACTION_SERVER_PACKAGES_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join("packages"));

        Ok(Self {
            lock_path: home.join("server.lock"),
            db_path: home.join("action_server.db"),
            runs_path: home.join("runs"),
            packages_root,
            bind_addr: std::env::var("ACTION_SERVER_BIND").unwrap_or_else(|_| "127.0.0.1:8087".to_string()),
            api_token: std::env::var("ACTION_SERVER_API_TOKEN").ok().filter(|s| !s.is_empty()),
            builder_cmd: std::env::var("ACTION_SERVER_BUILDER_CMD")
                .ok()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| vec!["action-server-build-env".to_string()]),
            decrypt_keys_json: std::env::var("ACTION_SERVER_DECRYPT_KEYS").ok(),
            container_mode: std::env::var("ACTION_SERVER_CONTAINER_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            post_run_cmd: std::env::var("ACTION_SERVER_POST_RUN_CMD").ok().filter(|s| !s.is_empty()),
            parent_pid: std::env::var("ACTION_SERVER_PARENT_PID").ok().and_then(|s| s.parse().ok()),
            home,
        })
    }

    pub fn decrypt_key_list(&self) -> Result<Vec<String>, ConfigError> {
        match &self.decrypt_keys_json {
            Some(raw) => serde_json::from_str(raw).map_err(ConfigError::BadDecryptKeys),
            None => Ok(Vec::new()),
        }
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("ACTION_SERVER_HOME") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("action-server"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHomeDir)?;
    Ok(PathBuf::from(home).join(".local/state/action-server"))
}

/// Poll interval for the parent-pid guardian.
pub fn guardian_poll_interval() -> Duration {
    std::env::var("ACTION_SERVER_GUARDIAN_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(as_engine::DEFAULT_GUARDIAN_POLL_INTERVAL)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
