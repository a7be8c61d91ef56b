// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end exercises of the run lifecycle against real (subprocess)
//! workers speaking the length-framed JSON protocol directly, bypassing
//! the HTTP surface so each scenario stays focused on the
//! store/pool/catalog/bus/codec composition underneath it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, AeadCore};
use as_bus::Bus;
use as_catalog::{Catalog, CatalogFilters};
use as_core::{Action, ActionPackage, FakeClock, ManagedParamKind, RunId, RunStatus};
use as_engine::{Invocation, InvokeMode, InvokeOutcome, LifecycleManager};
use as_envelope::{decode_envelope, DecryptKeys, InvocationEnvelope, RequestParts};
use as_pool::{EnvironmentBuilderAdapter, Pool, PoolConfig};
use as_storage::{RunFilter, RunStore};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A worker that speaks the real 4-byte-length-prefixed JSON protocol
/// over stdio, parameterized by `sys.argv` so one script fixture covers
/// every scenario below:
/// - `echo <sleep_ms>`: answers every request with `"Hello <name>!"`,
///   sleeping `sleep_ms` first.
/// - `echo_params`: answers with the resolved managed params, so a test
///   can assert on what actually reached the worker.
/// - `crash`: exits nonzero the instant a request arrives.
/// - `crash_once <marker>`: crashes once, then (once a fresh process is
///   spawned and the marker file exists) answers normally -- exercises
///   "slot discarded, next submission gets a new one".
/// - `hang`: never answers a request; on `Cancel` it exits cleanly.
const WORKER_SCRIPT: &str = r#"
import json, os, struct, sys, time

def read_msg():
    header = sys.stdin.buffer.read(4)
    if len(header) < 4:
        sys.exit(0)
    (length,) = struct.unpack(">I", header)
    return json.loads(sys.stdin.buffer.read(length))

def write_msg(obj):
    data = json.dumps(obj).encode("utf-8")
    sys.stdout.buffer.write(struct.pack(">I", len(data)))
    sys.stdout.buffer.write(data)
    sys.stdout.buffer.flush()

mode = sys.argv[1] if len(sys.argv) > 1 else "echo"
sleep_ms = int(sys.argv[2]) if len(sys.argv) > 2 else 0
marker = sys.argv[3] if len(sys.argv) > 3 else None

def respond_hello(msg):
    name = msg.get("payload", {}).get("name", "world")
    write_msg({"kind": "Result", "run_id": msg["run_id"], "status": "PASS", "result": "Hello " + name + "!"})

write_msg({"kind": "Ready"})
while True:
    msg = read_msg()
    kind = msg.get("kind")
    if kind == "Request":
        if mode == "crash":
            sys.exit(7)
        elif mode == "crash_once":
            if marker is not None and not os.path.exists(marker):
                open(marker, "w").close()
                sys.exit(7)
            respond_hello(msg)
        elif mode == "hang":
            read_msg()
            sys.exit(0)
        elif mode == "echo_params":
            write_msg({
                "kind": "Result",
                "run_id": msg["run_id"],
                "status": "PASS",
                "result": msg.get("managed_params", {}),
            })
        else:
            if sleep_ms > 0:
                time.sleep(sleep_ms / 1000.0)
            respond_hello(msg)
    elif kind == "Ping":
        write_msg({"kind": "Pong"})
    elif kind == "Shutdown":
        sys.exit(0)
"#;

fn worker_command(mode: &str, sleep_ms: u64, marker: Option<&std::path::Path>) -> Vec<String> {
    let mut command =
        vec!["python3".to_string(), "-c".to_string(), WORKER_SCRIPT.to_string(), mode.to_string(), sleep_ms.to_string()];
    if let Some(marker) = marker {
        command.push(marker.display().to_string());
    }
    command
}

/// A builder command whose only job is to print a fixed `{"location":
/// ..., "worker_command": [...]}` blob on stdout, the way a real
/// environment builder would once it has finished preparing a venv.
/// Printed via a Python raw string rather than shell quoting since
/// `worker_command` itself contains a JSON-and-Python-heavy script.
fn builder_command(worker_command: Vec<String>) -> Vec<String> {
    let output = serde_json::json!({"location": "/tmp/action-server-specs-env", "worker_command": worker_command});
    let payload = serde_json::to_string(&output).expect("serializable builder output");
    let code = format!("import sys; sys.stdout.write(r'''{payload}''')");
    vec!["python3".to_string(), "-c".to_string(), code]
}

struct Harness {
    manager: Arc<LifecycleManager<FakeClock>>,
    store: Arc<RunStore>,
}

fn harness(
    action_slug: &str,
    managed_params: HashMap<String, ManagedParamKind>,
    command: Vec<String>,
    cancel_grace: Duration,
    decrypt_keys: DecryptKeys,
) -> Harness {
    let store = Arc::new(RunStore::open_in_memory().expect("in-memory store opens"));
    let pkg = ActionPackage::builder().slug("pkg").manifest_hash(format!("hash-{action_slug}")).build();
    let action = Action::builder().slug(action_slug).package_id(pkg.id).managed_params(managed_params).build();
    store.upsert_package(&pkg).expect("package upserts");
    store.replace_package_actions(&pkg.id, &[action]).expect("actions replace");

    let catalog = Arc::new(Catalog::new(CatalogFilters::default()));
    catalog.rebuild(&store).expect("catalog rebuilds");

    let pool_config = PoolConfig { max_processes: 1, max_waiters: 4, cancel_grace, ..PoolConfig::default() };
    let pool = Arc::new(Pool::new(pool_config));
    let builder = Arc::new(EnvironmentBuilderAdapter::new(builder_command(command)));
    let bus = Arc::new(Bus::new());
    let runs_root = std::env::temp_dir().join("action-server-specs").join(action_slug);

    let manager = Arc::new(LifecycleManager::with_clock(
        Arc::clone(&store),
        pool,
        catalog,
        bus,
        builder,
        decrypt_keys,
        None,
        runs_root,
        FakeClock::new(),
    ));
    Harness { manager, store }
}

fn invocation(action_slug: &str, payload: serde_json::Value, mode: InvokeMode, request_id: Option<&str>) -> Invocation {
    let mut envelope = InvocationEnvelope::default();
    envelope.request_id = request_id.map(str::to_string);
    Invocation {
        package_slug: "pkg".to_string(),
        action_slug: action_slug.to_string(),
        input_payload: payload,
        envelope,
        headers: HashMap::new(),
        mode,
        callback_url: None,
    }
}

// Scenario 1: sync success.
#[tokio::test]
async fn sync_success_returns_the_worker_result_and_a_pass_run() {
    let harness = harness("greet", HashMap::new(), worker_command("echo", 0, None), Duration::from_secs(2), DecryptKeys::empty());

    let outcome = harness.manager.invoke(invocation("greet", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, None)).await.unwrap();

    let InvokeOutcome::Completed(run) = outcome else { panic!("expected a synchronous completion") };
    assert_eq!(run.status, RunStatus::Pass);
    assert_eq!(run.result_payload, Some(serde_json::json!("Hello Ada!")));
    assert!(run.finished_at_ms.is_some());
}

// Scenario 2: idempotent resubmission.
#[tokio::test]
async fn idempotent_resubmission_reuses_the_same_run() {
    let harness = harness("greet", HashMap::new(), worker_command("echo", 0, None), Duration::from_secs(2), DecryptKeys::empty());

    let first = harness
        .manager
        .invoke(invocation("greet", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, Some("abc")))
        .await
        .unwrap();
    let InvokeOutcome::Completed(first_run) = first else { panic!("expected completion") };

    let second = harness
        .manager
        .invoke(invocation("greet", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, Some("abc")))
        .await
        .unwrap();
    let InvokeOutcome::Completed(second_run) = second else { panic!("expected completion") };

    assert_eq!(first_run.id, second_run.id);
    let page = harness.store.cursor_query(&RunFilter::default(), 10, None).unwrap();
    assert_eq!(page.runs.len(), 1);
}

// Scenario 3: deferred return races a timeout.
#[tokio::test]
async fn deferred_mode_returns_pending_then_the_run_completes_on_its_own() {
    let harness = harness(
        "sleeper",
        HashMap::new(),
        worker_command("echo", 300, None),
        Duration::from_secs(2),
        DecryptKeys::empty(),
    );

    let outcome = harness
        .manager
        .invoke(invocation(
            "sleeper",
            serde_json::json!({"name": "Ada"}),
            InvokeMode::Deferred { timeout: Duration::from_millis(50) },
            None,
        ))
        .await
        .unwrap();

    let InvokeOutcome::Pending(run_id) = outcome else { panic!("expected the deferred timeout to win the race") };

    let mid_flight = harness.store.get_run(&run_id).unwrap().expect("run row exists");
    assert_eq!(mid_flight.status, RunStatus::Running);

    let finished = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(run) = harness.store.get_run(&run_id).unwrap() {
                if run.status.is_terminal() {
                    return run;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("run finishes within the timeout budget");

    assert_eq!(finished.status, RunStatus::Pass);
    assert_eq!(finished.result_payload, Some(serde_json::json!("Hello Ada!")));
}

// Scenario 4: encrypted secret delivery.
#[tokio::test]
async fn encrypted_secret_delivery_resolves_the_managed_param_and_never_surfaces_in_debug() {
    let mut managed_params = HashMap::new();
    managed_params.insert("pw".to_string(), ManagedParamKind::Secret);

    let key = Aes256Gcm::generate_key(&mut OsRng);
    let cipher = Aes256Gcm::new(&key);
    let key_bytes: [u8; 32] = key.into();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let plaintext = br#"{"secrets":{"pw":"hunter2"}}"#;
    let combined = cipher.encrypt(&nonce, plaintext.as_ref()).unwrap();
    let (ciphertext, tag) = combined.split_at(combined.len() - 16);

    let cipher_envelope_json = serde_json::json!({
        "cipher": BASE64.encode(ciphertext),
        "algorithm": "aes256-gcm",
        "iv": BASE64.encode(nonce),
        "auth-tag": BASE64.encode(tag),
    });
    let header_value = BASE64.encode(serde_json::to_vec(&cipher_envelope_json).unwrap());

    let parts = RequestParts {
        composite_body: false,
        body: serde_json::json!({}),
        headers: HashMap::from([("x-action-context".to_string(), header_value)]),
    };
    let decrypt_keys = DecryptKeys::from_base64_list([BASE64.encode(key_bytes)]).unwrap();
    let (input_payload, envelope) = decode_envelope(&parts, &decrypt_keys).unwrap();
    assert!(!format!("{envelope:?}").contains("hunter2"));

    let harness = harness(
        "login",
        managed_params,
        worker_command("echo_params", 0, None),
        Duration::from_secs(2),
        decrypt_keys,
    );

    let invocation = Invocation {
        package_slug: "pkg".to_string(),
        action_slug: "login".to_string(),
        input_payload,
        envelope,
        headers: HashMap::new(),
        mode: InvokeMode::Sync,
        callback_url: None,
    };

    let outcome = harness.manager.invoke(invocation).await.unwrap();
    let InvokeOutcome::Completed(run) = outcome else { panic!("expected completion") };
    assert_eq!(run.status, RunStatus::Pass);
    assert_eq!(
        run.result_payload,
        Some(serde_json::json!({"pw": {"kind": "secret", "value": "hunter2"}}))
    );
}

// Scenario 5: worker crash produces a FAIL, and the discarded slot
// doesn't poison the next submission on the same environment.
#[tokio::test]
async fn worker_crash_fails_the_run_and_the_next_submission_gets_a_fresh_slot() {
    let marker_dir = tempfile::tempdir().unwrap();
    let marker = marker_dir.path().join("crashed-once");
    let harness = harness(
        "flaky",
        HashMap::new(),
        worker_command("crash_once", 0, Some(&marker)),
        Duration::from_secs(2),
        DecryptKeys::empty(),
    );

    let first = harness.manager.invoke(invocation("flaky", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, None)).await.unwrap();
    let InvokeOutcome::Completed(first_run) = first else { panic!("expected completion") };
    assert_eq!(first_run.status, RunStatus::Fail);
    assert!(first_run.error_message.is_some());

    let second = harness.manager.invoke(invocation("flaky", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, None)).await.unwrap();
    let InvokeOutcome::Completed(second_run) = second else { panic!("expected completion") };
    assert_eq!(second_run.status, RunStatus::Pass);
    assert_eq!(second_run.result_payload, Some(serde_json::json!("Hello Ada!")));
}

// Scenario 6: cancellation of a running run reaches a terminal state
// within the configured grace.
#[tokio::test]
async fn cancelling_a_running_invocation_reaches_cancelled() {
    let harness = harness(
        "longrunner",
        HashMap::new(),
        worker_command("hang", 0, None),
        Duration::from_millis(300),
        DecryptKeys::empty(),
    );

    let manager = Arc::clone(&harness.manager);
    let handle = tokio::spawn(async move {
        manager.invoke(invocation("longrunner", serde_json::json!({}), InvokeMode::Sync, Some("cancel-me"))).await
    });

    let run_id = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(run) = harness.store.find_run_by_request_id("pkg", "longrunner", "cancel-me").unwrap() {
                if run.status == RunStatus::Running {
                    return run.id;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("run reaches RUNNING before we try to cancel it");

    harness.manager.cancel(run_id).await;

    let outcome = tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
    let InvokeOutcome::Completed(run) = outcome else { panic!("expected the cancellation to resolve synchronously") };
    assert_eq!(run.status, RunStatus::Cancelled);
}

// A universally quantified invariant from the run-status contract:
// every terminal run satisfies `finished_at` set and `started_at <=
// finished_at`.
#[tokio::test]
async fn every_terminal_run_satisfies_its_timestamp_invariant() {
    let harness = harness("greet", HashMap::new(), worker_command("echo", 0, None), Duration::from_secs(2), DecryptKeys::empty());
    let outcome = harness.manager.invoke(invocation("greet", serde_json::json!({"name": "Ada"}), InvokeMode::Sync, None)).await.unwrap();
    let InvokeOutcome::Completed(run) = outcome else { panic!("expected completion") };
    assert!(run.invariants_hold());
}

// Cancelling a run id the manager has never seen is a no-op rather than
// an error, the same as the unknown-environment pool path.
#[tokio::test]
async fn cancelling_an_unknown_run_is_a_noop() {
    let harness = harness("greet", HashMap::new(), worker_command("echo", 0, None), Duration::from_secs(2), DecryptKeys::empty());
    harness.manager.cancel(RunId::new()).await;
}
