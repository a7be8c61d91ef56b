// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use as_core::{ActionPackage, RunStatus};

fn store_with_one_action() -> (RunStore, ActionPackageId, ActionId) {
    let store = RunStore::open_in_memory().unwrap();
    let pkg = ActionPackage::builder().slug("greeter").build();
    store.upsert_package(&pkg).unwrap();
    let action = Action::builder().slug("greet").package_id(pkg.id).build();
    store.replace_package_actions(&pkg.id, std::slice::from_ref(&action)).unwrap();
    (store, pkg.id, action.id)
}

#[test]
fn upsert_package_then_lookup_by_slug() {
    let store = RunStore::open_in_memory().unwrap();
    let pkg = ActionPackage::builder().slug("greeter").build();
    store.upsert_package(&pkg).unwrap();
    let found = store.get_package_by_slug("greeter").unwrap().unwrap();
    assert_eq!(found.slug, "greeter");
}

#[test]
fn replace_package_actions_disables_obsolete_rows() {
    let store = RunStore::open_in_memory().unwrap();
    let pkg = ActionPackage::builder().slug("greeter").build();
    store.upsert_package(&pkg).unwrap();

    let a1 = Action::builder().slug("greet").package_id(pkg.id).build();
    let a2 = Action::builder().slug("farewell").package_id(pkg.id).build();
    store.replace_package_actions(&pkg.id, &[a1.clone(), a2.clone()]).unwrap();
    assert!(store.find_enabled_action("greeter", "farewell").unwrap().is_some());

    // Reimport drops "farewell".
    store.replace_package_actions(&pkg.id, std::slice::from_ref(&a1)).unwrap();
    assert!(store.find_enabled_action("greeter", "farewell").unwrap().is_none());
    assert!(store.find_enabled_action("greeter", "greet").unwrap().is_some());
}

#[test]
fn create_run_assigns_monotonic_run_numbers() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let r1 = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();
    let r2 = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 2)
        .unwrap();
    assert_eq!(r1.run_number, 1);
    assert_eq!(r2.run_number, 2);
}

#[test]
fn create_run_with_request_id_is_findable_for_idempotency() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let run = store
        .create_run(
            RunId::new(),
            &action_id,
            "greeter",
            "greet",
            &serde_json::json!({}),
            Some("req-1"),
            None,
            1,
        )
        .unwrap();
    let found = store.find_run_by_request_id("greeter", "greet", "req-1").unwrap().unwrap();
    assert_eq!(found.id, run.id);
}

#[test]
fn dispatch_then_finish_follows_legal_transitions() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let run = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();

    store.mark_dispatched(&run.id, Path::new("runs/1"), 2).unwrap();
    let dispatched = store.get_run(&run.id).unwrap().unwrap();
    assert_eq!(dispatched.status, RunStatus::Running);
    assert_eq!(dispatched.artifact_dir, Some(PathBuf::from("runs/1")));

    store.finish(&run.id, RunStatus::Pass, Some(&serde_json::json!("ok")), None, 3).unwrap();
    let finished = store.get_run(&run.id).unwrap().unwrap();
    assert_eq!(finished.status, RunStatus::Pass);
    assert_eq!(finished.result_payload, Some(serde_json::json!("ok")));
    assert_eq!(finished.finished_at_ms, Some(3));
    assert!(finished.invariants_hold());
}

#[test]
fn illegal_transition_is_rejected() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let run = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();
    // NOT_RUN -> PASS is illegal; only RUNNING -> PASS is.
    let result = store.finish(&run.id, RunStatus::Pass, None, None, 2);
    assert!(matches!(result, Err(StorageError::InvalidTransition { .. })));
}

#[test]
fn reset_non_terminal_to_cancelled_covers_not_run_and_running() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let not_run = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();
    let running = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();
    store.mark_dispatched(&running.id, Path::new("runs/2"), 2).unwrap();

    let affected = store.reset_non_terminal_to_cancelled(10).unwrap();
    assert_eq!(affected, 2);
    assert_eq!(store.get_run(&not_run.id).unwrap().unwrap().status, RunStatus::Cancelled);
    assert_eq!(store.get_run(&running.id).unwrap().unwrap().status, RunStatus::Cancelled);
}

#[test]
fn cursor_query_pages_in_creation_order() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    for i in 0..5u64 {
        store
            .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, i)
            .unwrap();
    }

    let filter = RunFilter::default();
    let page1 = store.cursor_query(&filter, 2, None).unwrap();
    assert_eq!(page1.runs.len(), 2);
    assert!(page1.next_cursor.is_some());

    let page2 = store.cursor_query(&filter, 2, page1.next_cursor.as_deref()).unwrap();
    assert_eq!(page2.runs.len(), 2);
    assert_ne!(page1.runs[0].id, page2.runs[0].id);

    let page3 = store.cursor_query(&filter, 2, page2.next_cursor.as_deref()).unwrap();
    assert_eq!(page3.runs.len(), 1);
    assert_eq!(page3.next_cursor, None);
}

#[test]
fn cursor_query_filters_by_status() {
    let (store, _pkg_id, action_id) = store_with_one_action();
    let a = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 1)
        .unwrap();
    let b = store
        .create_run(RunId::new(), &action_id, "greeter", "greet", &serde_json::json!({}), None, None, 2)
        .unwrap();
    store.mark_dispatched(&b.id, Path::new("runs/2"), 3).unwrap();

    let filter = RunFilter { status: Some(RunStatus::NotRun), ..Default::default() };
    let page = store.cursor_query(&filter, 10, None).unwrap();
    assert_eq!(page.runs.len(), 1);
    assert_eq!(page.runs[0].id, a.id);
}
