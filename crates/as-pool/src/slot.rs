// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single worker process and the request/result exchange over its
//! dedicated length-framed channel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use as_core::{RunId, WorkerSlotId, WorkerSlotState};
use as_wire::{read_message, write_message, ManagedParamValue, Message};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;

use crate::error::PoolError;

/// Everything the pool needs to dispatch one call to a worker.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub run_id: RunId,
    pub action_qualified_name: String,
    pub payload: serde_json::Value,
    pub managed_params: HashMap<String, ManagedParamValue>,
    pub headers: HashMap<String, String>,
    pub artifact_dir: PathBuf,
}

/// A live child process bound to one [`as_core::Environment`]. Taken out of
/// the pool's idle queue while dispatching a call so the pool lock is never
/// held across the I/O round-trip.
pub struct Slot {
    pub id: WorkerSlotId,
    pub state: WorkerSlotState,
    pub last_used: Instant,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Default window given to a worker to honor a cooperative cancel before
/// the pool forcibly terminates it ("~5s").
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Timeout waiting for a freshly spawned worker to report `Ready`.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

impl Slot {
    /// Spawn a worker process for `command` and block until it reports
    /// `Message::Ready`.
    pub async fn spawn(id: WorkerSlotId, command: &[String]) -> Result<Self, PoolError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PoolError::SpawnFailed("empty worker command template".into()))?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| PoolError::SpawnFailed(format!("{program}: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| PoolError::SpawnFailed("worker stdin not piped".into()))?;
        let stdout = BufReader::new(
            child.stdout.take().ok_or_else(|| PoolError::SpawnFailed("worker stdout not piped".into()))?,
        );

        let mut slot = Slot { id, state: WorkerSlotState::Busy, last_used: Instant::now(), child, stdin, stdout };

        match tokio::time::timeout(READY_TIMEOUT, read_message::<Message, _>(&mut slot.stdout)).await {
            Ok(Ok(Message::Ready)) => {
                slot.state = WorkerSlotState::Idle;
                Ok(slot)
            }
            Ok(Ok(other)) => {
                let _ = slot.child.start_kill();
                Err(PoolError::SpawnFailed(format!("expected Ready, got {other:?}")))
            }
            Ok(Err(e)) => {
                let _ = slot.child.start_kill();
                Err(PoolError::Protocol(e))
            }
            Err(_) => {
                let _ = slot.child.start_kill();
                Err(PoolError::SpawnFailed("worker did not report ready in time".into()))
            }
        }
    }

    /// Run one request against this slot, racing the result against an
    /// incoming cancel signal. Returns the slot back to the caller (for
    /// release) paired with the call's outcome; a `None` slot means it was
    /// terminated and must not be reused.
    pub async fn dispatch(
        mut self,
        request: WorkerRequest,
        mut cancel_rx: mpsc::Receiver<()>,
        cancel_grace: Duration,
    ) -> (Option<Self>, Result<Message, PoolError>) {
        let req = Message::Request {
            run_id: request.run_id,
            action_qualified_name: request.action_qualified_name,
            payload: request.payload,
            managed_params: request.managed_params,
            headers: request.headers,
            artifact_dir: request.artifact_dir,
        };

        if let Err(e) = write_message(&mut self.stdin, &req).await {
            let _ = self.child.start_kill();
            return (None, Err(PoolError::Protocol(e)));
        }

        let outcome = tokio::select! {
            biased;

            result = read_message::<Message, _>(&mut self.stdout) => {
                self.resolve_read(result)
            }

            _ = cancel_rx.recv() => {
                self.resolve_cancel(request.run_id, cancel_grace).await
            }
        };

        self.last_used = Instant::now();
        match outcome {
            Ok(msg) => {
                self.state = WorkerSlotState::Idle;
                (Some(self), Ok(msg))
            }
            Err(e) => {
                self.state = WorkerSlotState::Poisoned;
                let _ = self.child.start_kill();
                (None, Err(e))
            }
        }
    }

    fn resolve_read(&self, result: Result<Message, as_wire::ProtocolError>) -> Result<Message, PoolError> {
        match result {
            Ok(msg @ Message::Result { .. }) => Ok(msg),
            Ok(other) => Err(PoolError::WorkerCrash(format!("unexpected message {other:?}"))),
            Err(e) => Err(PoolError::WorkerCrash(format!("worker terminated: {e}"))),
        }
    }

    async fn resolve_cancel(&mut self, run_id: RunId, grace: Duration) -> Result<Message, PoolError> {
        if write_message(&mut self.stdin, &Message::Cancel { run_id }).await.is_err() {
            return Err(PoolError::WorkerCrash("worker terminated".into()));
        }
        match tokio::time::timeout(grace, read_message::<Message, _>(&mut self.stdout)).await {
            Ok(Ok(msg @ Message::Result { .. })) => Ok(msg),
            Ok(_) => Err(PoolError::Cancelled),
            Err(_) => Err(PoolError::Cancelled),
        }
    }

    /// Ask a freshly spawned worker to enumerate its actions. Used only by
    /// the transient import-time worker, never by a pooled slot
    /// mid-lifecycle.
    pub async fn enumerate(&mut self) -> Result<Vec<as_wire::DiscoveredAction>, PoolError> {
        if write_message(&mut self.stdin, &Message::Enumerate).await.is_err() {
            return Err(PoolError::WorkerCrash("worker terminated before enumerate".into()));
        }
        match tokio::time::timeout(READY_TIMEOUT, read_message::<Message, _>(&mut self.stdout)).await {
            Ok(Ok(Message::Actions { actions })) => Ok(actions),
            Ok(Ok(other)) => Err(PoolError::WorkerCrash(format!("expected Actions, got {other:?}"))),
            Ok(Err(e)) => Err(PoolError::Protocol(e)),
            Err(_) => Err(PoolError::WorkerCrash("worker did not respond to enumerate in time".into())),
        }
    }

    /// Best-effort liveness probe used by idle-slot reaping.
    pub async fn ping(&mut self) -> bool {
        if write_message(&mut self.stdin, &Message::Ping).await.is_err() {
            return false;
        }
        matches!(
            tokio::time::timeout(Duration::from_secs(2), read_message::<Message, _>(&mut self.stdout)).await,
            Ok(Ok(Message::Pong))
        )
    }

    pub async fn terminate(mut self) {
        let _ = write_message(&mut self.stdin, &Message::Shutdown).await;
        let _ = tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await;
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
