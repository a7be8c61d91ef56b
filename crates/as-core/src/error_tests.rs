// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn wire_str_is_stable_per_variant() {
    assert_eq!(ErrorKind::DecryptFailed.as_wire_str(), "DecryptFailed");
    assert_eq!(ErrorKind::Unauthorized.as_wire_str(), "Unauthorized");
    assert_eq!(
        ErrorKind::InvalidStateTransition { from: "a".into(), to: "b".into() }.as_wire_str(),
        "InvalidStateTransition"
    );
}

#[test]
fn envelope_and_schema_errors_are_synchronous() {
    assert!(ErrorKind::BadEnvelope("x".into()).is_synchronous());
    assert!(ErrorKind::SchemaViolation("x".into()).is_synchronous());
    assert!(ErrorKind::Overloaded.is_synchronous());
}

#[test]
fn worker_and_storage_errors_are_not_synchronous() {
    assert!(!ErrorKind::WorkerCrash("exit 1".into()).is_synchronous());
    assert!(!ErrorKind::HookFailed("boom".into()).is_synchronous());
    assert!(!ErrorKind::DbFromFuture { found: 3, max: 2 }.is_synchronous());
}
