// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Run Lifecycle Manager: composes the Run Store, Process Pool,
//! Envelope Codec, Live-Update Bus, and Post-Run Hook behind a single
//! `invoke`/`cancel` surface.
//!
//! Generic over `Clock` rather than boxed as `dyn Clock`, since
//! `Clock: Clone` isn't object-safe.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use as_bus::Bus;
use as_catalog::Catalog;
use as_core::{Clock, ErrorKind, ManagedParamKind, Run, RunId, RunStatus, SystemClock, Topic};
use as_envelope::{merge_secret_sources, resolve_managed_param, DecryptKeys, InvocationEnvelope};
use as_pool::{EnvironmentBuilderAdapter, Pool, WorkerRequest};
use as_storage::{RunFilter, RunPage, RunStore};
use as_wire::{ManagedParamValue, Message, RunOutcome};
use tokio::sync::oneshot;

use crate::error::EngineError;
use crate::hook::PostRunHook;
use crate::secrets_store::SecretStore;

/// Outcome of one `invoke` call.
#[derive(Debug, Clone)]
pub enum InvokeOutcome {
    /// The run reached a terminal status before the caller needed an
    /// answer (synchronous mode, or the deferred timer never fired).
    Completed(Run),
    /// The run is still executing; the caller gets an acknowledgement
    /// carrying the run id instead of a result body.
    Pending(RunId),
}

/// How long `invoke` waits before falling back to [`InvokeOutcome::Pending`].
#[derive(Debug, Clone, Copy)]
pub enum InvokeMode {
    /// Await the run to completion, however long it takes.
    Sync,
    /// Race completion against `timeout`; past it, return `Pending`.
    Deferred { timeout: Duration },
}

/// Bounded retry budget for callback delivery.
const CALLBACK_RETRY_ATTEMPTS: u32 = 3;
const CALLBACK_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// A fully resolved invocation, ready to hand to the pool.
pub struct Invocation {
    pub package_slug: String,
    pub action_slug: String,
    pub input_payload: serde_json::Value,
    pub envelope: InvocationEnvelope,
    pub headers: HashMap<String, String>,
    pub mode: InvokeMode,
    pub callback_url: Option<String>,
}

pub struct LifecycleManager<C: Clock = SystemClock> {
    store: Arc<RunStore>,
    pool: Arc<Pool>,
    catalog: Arc<Catalog>,
    bus: Arc<Bus>,
    builder: Arc<EnvironmentBuilderAdapter>,
    decrypt_keys: DecryptKeys,
    post_run_hook: Option<Arc<PostRunHook>>,
    runs_root: PathBuf,
    http_client: reqwest::Client,
    secrets: SecretStore,
    clock: C,
}

impl LifecycleManager<SystemClock> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<RunStore>,
        pool: Arc<Pool>,
        catalog: Arc<Catalog>,
        bus: Arc<Bus>,
        builder: Arc<EnvironmentBuilderAdapter>,
        decrypt_keys: DecryptKeys,
        post_run_hook: Option<Arc<PostRunHook>>,
        runs_root: PathBuf,
    ) -> Self {
        Self::with_clock(store, pool, catalog, bus, builder, decrypt_keys, post_run_hook, runs_root, SystemClock)
    }
}

impl<C: Clock + 'static> LifecycleManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn with_clock(
        store: Arc<RunStore>,
        pool: Arc<Pool>,
        catalog: Arc<Catalog>,
        bus: Arc<Bus>,
        builder: Arc<EnvironmentBuilderAdapter>,
        decrypt_keys: DecryptKeys,
        post_run_hook: Option<Arc<PostRunHook>>,
        runs_root: PathBuf,
        clock: C,
    ) -> Self {
        Self {
            store,
            pool,
            catalog,
            bus,
            builder,
            decrypt_keys,
            post_run_hook,
            runs_root,
            http_client: reqwest::Client::new(),
            secrets: SecretStore::new(),
            clock,
        }
    }

    /// Stage secrets for `package_slug` in memory, replacing whatever was
    /// staged before. A per-request envelope value for the same name
    /// always wins over these.
    pub fn set_package_secrets(&self, package_slug: &str, secrets: HashMap<String, serde_json::Value>) {
        self.secrets.set(package_slug, secrets);
    }

    /// Invoke `(package_slug, action_slug)`. Handles idempotent
    /// resubmission, managed-parameter resolution, environment
    /// resolution, dispatch, and (for deferred/callback modes) the
    /// timer race.
    pub async fn invoke(self: &Arc<Self>, invocation: Invocation) -> Result<InvokeOutcome, EngineError> {
        let snapshot = self.catalog.current();
        let Some((package, action)) = snapshot.find_action(&invocation.package_slug, &invocation.action_slug) else {
            return Err(EngineError::UnknownAction(invocation.package_slug, invocation.action_slug));
        };
        let package = package.clone();
        let action = action.clone();

        let mut envelope = invocation.envelope;
        merge_secret_sources(&mut envelope, &self.secrets.get(&invocation.package_slug));

        if let Some(request_id) = envelope.request_id.clone() {
            if let Some(existing) = self.store.find_run_by_request_id(&package.slug, &action.slug, &request_id)? {
                if existing.status.is_terminal() {
                    return Ok(InvokeOutcome::Completed(existing));
                }
                return self.attach_to_existing(existing, invocation.mode).await;
            }
        }

        let run_id = RunId::new();
        let now_ms = self.clock.epoch_ms();
        let run = match self.store.create_run(
            run_id,
            &action.id,
            &package.slug,
            &action.slug,
            &invocation.input_payload,
            envelope.request_id.as_deref(),
            invocation.callback_url.as_deref(),
            now_ms,
        ) {
            Ok(run) => run,
            Err(e) if e.is_duplicate_request_id() => {
                // Lost a race with a concurrent submission for the same
                // request id: attach to whichever run it created instead
                // of surfacing the unique-index violation.
                let request_id = envelope.request_id.as_deref().unwrap_or_default();
                let existing = self
                    .store
                    .find_run_by_request_id(&package.slug, &action.slug, request_id)?
                    .ok_or(e)?;
                if existing.status.is_terminal() {
                    return Ok(InvokeOutcome::Completed(existing));
                }
                return self.attach_to_existing(existing, invocation.mode).await;
            }
            Err(e) => return Err(e.into()),
        };

        let managed_params = self.build_managed_params(&action, &envelope, &invocation.headers)?;
        let env = self.builder.ensure(&package.manifest_hash, &package.directory).await?;

        let artifact_dir = self.runs_root.join(&package.slug).join(&action.slug).join(run.run_number.to_string());
        self.store.mark_dispatched(&run_id, &artifact_dir, self.clock.epoch_ms())?;
        self.bus.publish(Topic::Run(run_id.to_string()), serde_json::json!({"run_id": run_id, "status": "RUNNING"}));
        self.bus.publish(Topic::Runs, serde_json::json!({"run_id": run_id, "status": "RUNNING"}));

        let request = WorkerRequest {
            run_id,
            action_qualified_name: format!("{}.{}", package.slug, action.slug),
            payload: invocation.input_payload,
            managed_params,
            headers: invocation.headers,
            artifact_dir,
        };

        let (done_tx, done_rx) = oneshot::channel();
        let manager = Arc::clone(self);
        let invocation_context = envelope.invocation_context.clone();
        tokio::spawn(async move {
            let outcome = manager.execute_and_finish(run_id, &action.slug, env, request, invocation_context).await;
            let _ = done_tx.send(outcome);
        });

        match invocation.mode {
            InvokeMode::Sync => match done_rx.await {
                Ok(run) => Ok(InvokeOutcome::Completed(run)),
                Err(_) => self.fallback_read(run_id).await,
            },
            InvokeMode::Deferred { timeout } => {
                tokio::select! {
                    result = done_rx => match result {
                        Ok(run) => Ok(InvokeOutcome::Completed(run)),
                        Err(_) => self.fallback_read(run_id).await,
                    },
                    _ = tokio::time::sleep(timeout) => Ok(InvokeOutcome::Pending(run_id)),
                }
            }
        }
    }

    /// Resolve every declared managed parameter for `action`, in sorted
    /// name order. Secret-like kinds go through the envelope/header/env
    /// precedence chain; `Request` surfaces the forwarded headers, and
    /// `DataSource` surfaces the envelope's data-server handle.
    fn build_managed_params(
        &self,
        action: &as_core::Action,
        envelope: &InvocationEnvelope,
        headers: &HashMap<String, String>,
    ) -> Result<HashMap<String, ManagedParamValue>, EngineError> {
        let mut resolved = HashMap::with_capacity(action.managed_params.len());
        for name in action.managed_param_names() {
            let kind = action.managed_params[name];
            let value = if kind.is_secret_like() {
                match resolve_managed_param(name, kind, envelope, headers, &self.decrypt_keys)
                    .map_err(EngineError::ManagedParam)?
                {
                    Some((value, _source)) => value,
                    None => return Err(EngineError::MissingManagedParam(name.to_string())),
                }
            } else {
                match kind {
                    ManagedParamKind::Request => serde_json::json!(envelope.forwarded_headers),
                    ManagedParamKind::DataSource => envelope.data_context.clone().unwrap_or(serde_json::Value::Null),
                    ManagedParamKind::Secret | ManagedParamKind::OAuth2Secret => unreachable!("handled above"),
                }
            };
            resolved.insert(name.to_string(), ManagedParamValue { kind, value });
        }
        Ok(resolved)
    }

    /// Subscribe to the run's topic and wait for its terminal status,
    /// closing the race between the initial idempotency check and the
    /// subscription with a re-check store read, and falling back to a
    /// direct store read if the subscription is ever torn down (queue
    /// overflow) without a terminal event crossing it.
    async fn attach_to_existing(&self, existing: Run, mode: InvokeMode) -> Result<InvokeOutcome, EngineError> {
        let run_id = existing.id;
        if let Some(run) = self.store.get_run(&run_id)? {
            if run.status.is_terminal() {
                return Ok(InvokeOutcome::Completed(run));
            }
        }

        let (_subscriber_id, mut rx) = self.bus.subscribe(vec![Topic::Run(run_id.to_string())], 16);

        if let Some(run) = self.store.get_run(&run_id)? {
            if run.status.is_terminal() {
                return Ok(InvokeOutcome::Completed(run));
            }
        }

        let wait = async {
            while let Some(message) = rx.recv().await {
                let status = message.payload.get("status").and_then(|v| v.as_str());
                if matches!(status, Some("PASS") | Some("FAIL") | Some("CANCELLED")) {
                    break;
                }
            }
            self.fallback_read(run_id).await
        };

        match mode {
            InvokeMode::Sync => wait.await,
            InvokeMode::Deferred { timeout } => {
                tokio::select! {
                    result = wait => result,
                    _ = tokio::time::sleep(timeout) => Ok(InvokeOutcome::Pending(run_id)),
                }
            }
        }
    }

    async fn fallback_read(&self, run_id: RunId) -> Result<InvokeOutcome, EngineError> {
        match self.store.get_run(&run_id)? {
            Some(run) if run.status.is_terminal() => Ok(InvokeOutcome::Completed(run)),
            Some(_) => Ok(InvokeOutcome::Pending(run_id)),
            None => Ok(InvokeOutcome::Pending(run_id)),
        }
    }

    /// Dispatch `request` to the pool, persist the terminal outcome,
    /// publish it to the bus, fire the post-run hook, and best-effort
    /// deliver the async callback. Returns the finished run so a waiting
    /// `invoke` caller can resolve synchronously if it's still around.
    async fn execute_and_finish(
        self: Arc<Self>,
        run_id: RunId,
        action_slug: &str,
        env: as_core::Environment,
        request: WorkerRequest,
        invocation_context: HashMap<String, String>,
    ) -> Run {
        let artifact_dir = request.artifact_dir.clone();
        let outcome = self.pool.submit(&env, request).await;
        let now_ms = self.clock.epoch_ms();

        let (status, result_payload, error_message) = match outcome {
            Ok(Message::Result { status: RunOutcome::Pass, result, .. }) => (RunStatus::Pass, result, None),
            Ok(Message::Result { status: RunOutcome::Fail, error, .. }) => (RunStatus::Fail, None, error),
            Ok(_other) => (RunStatus::Fail, None, Some("unexpected worker response".to_string())),
            Err(as_pool::PoolError::Cancelled) => (RunStatus::Cancelled, None, None),
            Err(e) => (RunStatus::Fail, None, Some(e.to_string())),
        };

        if let Err(e) = self.store.finish(&run_id, status, result_payload.as_ref(), error_message.as_deref(), now_ms) {
            tracing::warn!(%run_id, error = %e, "failed to persist terminal run status");
        }

        let payload = serde_json::json!({
            "run_id": run_id,
            "status": status.to_string(),
            "result": result_payload,
            "error": error_message,
        });
        self.bus.publish(Topic::Run(run_id.to_string()), payload.clone());
        self.bus.publish(Topic::Runs, payload);

        let run = match self.store.get_run(&run_id) {
            Ok(Some(run)) => run,
            _ => Run {
                id: run_id,
                action_id: as_core::ActionId::from_string(""),
                status,
                run_number: 0,
                artifact_dir: Some(artifact_dir),
                input_payload: serde_json::Value::Null,
                result_payload,
                error_message,
                request_id: None,
                async_callback_url: None,
                created_at_ms: now_ms,
                started_at_ms: Some(now_ms),
                finished_at_ms: Some(now_ms),
            },
        };

        if let Some(hook) = &self.post_run_hook {
            let mut vars = invocation_context;
            vars.insert("run_id".to_string(), run_id.to_string());
            vars.insert("action_name".to_string(), action_slug.to_string());
            vars.insert("base_artifacts_dir".to_string(), self.runs_root.to_string_lossy().into_owned());
            vars.insert("run_artifacts_dir".to_string(), run.artifact_dir.as_deref().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default());
            hook.run(&vars).await;
        }

        if let Some(url) = run.async_callback_url.clone() {
            let manager = Arc::clone(&self);
            let run_for_callback = run.clone();
            tokio::spawn(async move { manager.deliver_callback(&url, &run_for_callback).await });
        }

        run
    }

    /// Best-effort POST of the terminal result to a caller-supplied
    /// callback URL, carrying the run id and client's `request_id` as
    /// headers. Failures are logged only: a missed callback is never
    /// authoritative, the run's own terminal status already is.
    async fn deliver_callback(&self, url: &str, run: &Run) {
        let body = serde_json::json!({
            "run_id": run.id,
            "status": run.status.to_string(),
            "result": run.result_payload,
            "error": run.error_message,
        });

        for attempt in 1..=CALLBACK_RETRY_ATTEMPTS {
            let mut req = self.http_client.post(url).json(&body).header("x-run-id", run.id.as_str());
            if let Some(request_id) = &run.request_id {
                req = req.header("x-actions-request-id", request_id.as_str());
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => return,
                Ok(resp) => {
                    tracing::warn!(%url, status = %resp.status(), attempt, "callback delivery rejected");
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, attempt, "callback delivery failed");
                }
            }
            if attempt < CALLBACK_RETRY_ATTEMPTS {
                tokio::time::sleep(CALLBACK_RETRY_BACKOFF * attempt).await;
            }
        }
        tracing::warn!(%url, run_id = %run.id, "callback delivery exhausted its retry budget");
    }

    /// Forward to the pool; the in-flight `execute_and_finish` task
    /// observes the resulting `PoolError::Cancelled` and persists
    /// `CANCELLED` itself, so there's no separate await-and-persist path
    /// here.
    pub async fn cancel(&self, run_id: RunId) {
        self.pool.cancel(run_id).await;
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, EngineError> {
        Ok(self.store.get_run(run_id)?)
    }

    pub fn find_run_by_request_id(&self, package_slug: &str, action_slug: &str, request_id: &str) -> Result<Option<Run>, EngineError> {
        Ok(self.store.find_run_by_request_id(package_slug, action_slug, request_id)?)
    }

    pub fn list_runs(&self, filter: &RunFilter, page_size: usize, page_after: Option<&str>) -> Result<RunPage, EngineError> {
        Ok(self.store.cursor_query(filter, page_size, page_after)?)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
