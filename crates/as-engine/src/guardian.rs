// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-PID Guardian: a background task that polls a configured parent
//! process id via a zero-signal liveness probe and triggers a graceful
//! server shutdown once that process is gone.

use std::sync::Arc;
use std::time::Duration;

use as_pool::Pool;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

/// Default interval between liveness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Send signal 0 to `pid`: no signal is actually delivered, only the
/// kernel's permission/existence check runs. `EPERM` still means the
/// process exists (just owned by someone else); only `ESRCH` and similar
/// mean it's gone.
fn is_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Spawn the guardian task. Returns its `JoinHandle`; dropping it does not
/// stop the task (it's meant to run for the server's lifetime).
pub fn spawn(parent_pid: i32, poll_interval: Duration, pool: Arc<Pool>, shutdown_grace: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(poll_interval).await;
            if is_alive(parent_pid) {
                continue;
            }
            warn!(parent_pid, "parent process is gone; shutting down");
            pool.shutdown(shutdown_grace).await;
            info!("shutdown complete, exiting");
            std::process::exit(0);
        }
    })
}

#[cfg(test)]
#[path = "guardian_tests.rs"]
mod tests;
