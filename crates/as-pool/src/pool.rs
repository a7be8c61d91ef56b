// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Process Pool: per-environment worker arenas, an idle
//! FIFO, a waiters FIFO, and cooperative cancellation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use as_core::{Environment, RunId, WorkerSlotId};
use as_wire::Message;
use tokio::sync::{mpsc, oneshot};

use crate::error::PoolError;
use crate::slot::{Slot, WorkerRequest, DEFAULT_CANCEL_GRACE};

/// Tunables for one pool instance. `min_processes`/`max_processes` are
/// per-environment.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_processes: usize,
    pub max_processes: usize,
    pub reuse_process: bool,
    pub cancel_grace: Duration,
    /// Waiters FIFO bound per environment. Exceeding it surfaces as
    /// `ErrorKind::Overloaded` rather than unbounded queueing latency
    ///.
    pub max_waiters: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_processes: 0,
            max_processes: 4,
            reuse_process: true,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            max_waiters: 64,
        }
    }
}

struct Waiter {
    run_id: RunId,
    request: WorkerRequest,
    responder: oneshot::Sender<Result<Message, PoolError>>,
}

/// Per-environment worker arena.
#[derive(Default)]
struct EnvPool {
    idle: VecDeque<Slot>,
    busy_count: usize,
    waiters: VecDeque<Waiter>,
    running: HashMap<RunId, mpsc::Sender<()>>,
    next_slot_id: u64,
}

impl EnvPool {
    fn total_slots(&self) -> usize {
        self.idle.len() + self.busy_count
    }

    fn next_id(&mut self) -> WorkerSlotId {
        let id = WorkerSlotId(self.next_slot_id);
        self.next_slot_id += 1;
        id
    }
}

/// What to do once a slot's outcome (or absence) and the waiters FIFO have
/// been reconciled under the lock.
enum Next {
    Reuse(Slot, Waiter),
    SpawnFresh(WorkerSlotId, Waiter),
    None,
}

/// The process pool. Construct once behind an `Arc<Pool>`: the dispatch
/// loop spawns background tasks against `self`, so every public method
/// that can trigger a re-dispatch takes `self: &Arc<Self>`.
pub struct Pool {
    config: PoolConfig,
    envs: tokio::sync::Mutex<HashMap<String, EnvPool>>,
    shutting_down: AtomicBool,
}

impl Pool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config, envs: tokio::sync::Mutex::new(HashMap::new()), shutting_down: AtomicBool::new(false) }
    }

    /// Submit one call against `env`. Resolves to the worker's terminal
    /// `Message::Result`, or a [`PoolError`] if the call could not be
    /// completed (spawn failure, crash, overload, cancellation, shutdown).
    pub async fn submit(self: &Arc<Self>, env: &Environment, request: WorkerRequest) -> Result<Message, PoolError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(PoolError::ShuttingDown);
        }

        // Acquired slot, or the id to spawn one at, decided without moving
        // `request` — it's only ever moved on the queued-waiter path below,
        // which returns before any code here would need it again.
        let acquired = {
            let mut envs = self.envs.lock().await;
            let env_pool = envs.entry(env.env_key.clone()).or_default();
            if let Some(slot) = env_pool.idle.pop_front() {
                env_pool.busy_count += 1;
                Some(Ok(slot))
            } else if env_pool.total_slots() < self.config.max_processes {
                env_pool.busy_count += 1;
                Some(Err(env_pool.next_id()))
            } else {
                None
            }
        };

        let slot = match acquired {
            Some(Ok(slot)) => slot,
            Some(Err(id)) => match Slot::spawn(id, &env.worker_command).await {
                Ok(slot) => slot,
                Err(e) => {
                    self.on_slot_gone(&env.env_key).await;
                    return Err(e);
                }
            },
            None => {
                let mut envs = self.envs.lock().await;
                let env_pool = envs.entry(env.env_key.clone()).or_default();
                if env_pool.waiters.len() >= self.config.max_waiters {
                    return Err(PoolError::Overloaded);
                }
                let (tx, rx) = oneshot::channel();
                env_pool.waiters.push_back(Waiter { run_id: request.run_id, request, responder: tx });
                drop(envs);
                return match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(PoolError::Cancelled),
                };
            }
        };

        self.run_on_slot(env, slot, request).await
    }

    /// Run `request` on an already-acquired `slot`, then release it and
    /// feed the waiters FIFO.
    async fn run_on_slot(self: &Arc<Self>, env: &Environment, slot: Slot, request: WorkerRequest) -> Result<Message, PoolError> {
        let run_id = request.run_id;
        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        {
            let mut envs = self.envs.lock().await;
            envs.entry(env.env_key.clone()).or_default().running.insert(run_id, cancel_tx);
        }

        let (slot, outcome) = slot.dispatch(request, cancel_rx, self.config.cancel_grace).await;

        {
            let mut envs = self.envs.lock().await;
            if let Some(env_pool) = envs.get_mut(&env.env_key) {
                env_pool.running.remove(&run_id);
            }
        }

        self.release(env, slot).await;
        outcome
    }

    /// Return a finished slot to the idle FIFO (if reusable and
    /// `reuse_process` is set) or discard it, then immediately re-dispatch
    /// the head waiter if one is pending.
    async fn release(self: &Arc<Self>, env: &Environment, slot: Option<Slot>) {
        let next = {
            let mut envs = self.envs.lock().await;
            let Some(env_pool) = envs.get_mut(&env.env_key) else { return };
            env_pool.busy_count = env_pool.busy_count.saturating_sub(1);

            match slot {
                Some(slot) if self.config.reuse_process => match env_pool.waiters.pop_front() {
                    Some(waiter) => {
                        env_pool.busy_count += 1;
                        Next::Reuse(slot, waiter)
                    }
                    None => {
                        env_pool.idle.push_back(slot);
                        Next::None
                    }
                },
                Some(slot) => {
                    tokio::spawn(slot.terminate());
                    match env_pool.waiters.pop_front() {
                        Some(waiter) => {
                            env_pool.busy_count += 1;
                            Next::SpawnFresh(env_pool.next_id(), waiter)
                        }
                        None => Next::None,
                    }
                }
                None => match env_pool.waiters.pop_front() {
                    Some(waiter) => {
                        env_pool.busy_count += 1;
                        Next::SpawnFresh(env_pool.next_id(), waiter)
                    }
                    None => Next::None,
                },
            }
        };

        match next {
            Next::Reuse(slot, waiter) => self.spawn_redispatch(env.clone(), Ok(slot), waiter),
            Next::SpawnFresh(id, waiter) => {
                let env = env.clone();
                let pool = Arc::clone(self);
                tokio::spawn(async move {
                    match Slot::spawn(id, &env.worker_command).await {
                        Ok(slot) => pool.redispatch(env, slot, waiter).await,
                        Err(e) => {
                            pool.on_slot_gone(&env.env_key).await;
                            let _ = waiter.responder.send(Err(e));
                        }
                    }
                });
            }
            Next::None => {}
        }
    }

    fn spawn_redispatch(self: &Arc<Self>, env: Environment, slot: Result<Slot, PoolError>, waiter: Waiter) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            match slot {
                Ok(slot) => pool.redispatch(env, slot, waiter).await,
                Err(e) => {
                    let _ = waiter.responder.send(Err(e));
                }
            }
        });
    }

    async fn redispatch(self: Arc<Self>, env: Environment, slot: Slot, waiter: Waiter) {
        let outcome = self.run_on_slot(&env, slot, waiter.request).await;
        let _ = waiter.responder.send(outcome);
    }

    async fn on_slot_gone(&self, env_key: &str) {
        let mut envs = self.envs.lock().await;
        if let Some(env_pool) = envs.get_mut(env_key) {
            env_pool.busy_count = env_pool.busy_count.saturating_sub(1);
        }
    }

    /// Cancel `run_id`. A queued run is removed from its waiters FIFO and
    /// resolved as cancelled; an executing run is sent a cooperative cancel
    /// signal. Unknown run ids are a no-op.
    pub async fn cancel(&self, run_id: RunId) {
        let mut envs = self.envs.lock().await;
        for env_pool in envs.values_mut() {
            if let Some(cancel_tx) = env_pool.running.get(&run_id) {
                let _ = cancel_tx.try_send(());
                return;
            }
            if let Some(pos) = env_pool.waiters.iter().position(|w| w.run_id == run_id) {
                if let Some(waiter) = env_pool.waiters.remove(pos) {
                    env_pool.busy_count = env_pool.busy_count.saturating_sub(1);
                    let _ = waiter.responder.send(Err(PoolError::Cancelled));
                }
                return;
            }
        }
    }

    /// Refuse new submissions, wait up to `grace` for in-flight workers to
    /// return, then terminate everything still running or idle. Queued
    /// waiters resolve as cancelled immediately.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let (idle_slots, had_running) = {
            let mut envs = self.envs.lock().await;
            let mut idle = Vec::new();
            let mut any_running = false;
            for env_pool in envs.values_mut() {
                idle.extend(env_pool.idle.drain(..));
                any_running |= !env_pool.running.is_empty();
                for waiter in env_pool.waiters.drain(..) {
                    let _ = waiter.responder.send(Err(PoolError::Cancelled));
                }
            }
            (idle, any_running)
        };

        for slot in idle_slots {
            slot.terminate().await;
        }

        if had_running {
            tokio::time::sleep(grace).await;
        }
    }

    /// Evict idle slots beyond `min_processes`, oldest-`last_used`-first.
    pub async fn evict_idle_beyond_min(&self, env_key: &str) {
        let stale = {
            let mut envs = self.envs.lock().await;
            let Some(env_pool) = envs.get_mut(env_key) else { return };
            let mut evictable = Vec::new();
            while env_pool.idle.len() > self.config.min_processes {
                let oldest_pos = env_pool
                    .idle
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, slot)| slot.last_used)
                    .map(|(i, _)| i);
                let Some(pos) = oldest_pos else { break };
                if let Some(slot) = env_pool.idle.remove(pos) {
                    evictable.push(slot);
                }
            }
            evictable
        };
        for slot in stale {
            slot.terminate().await;
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
