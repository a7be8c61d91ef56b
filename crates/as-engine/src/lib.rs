// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Run Lifecycle Manager: ties the Run Store, Process Pool, Envelope
//! Codec, Action Catalog, and Live-Update Bus together behind a single
//! invoke/cancel surface, plus the Post-Run Hook and Parent-PID Guardian
//! that run alongside it.

mod error;
mod guardian;
mod hook;
mod lifecycle;
mod secrets_store;

pub use error::EngineError;
pub use guardian::{spawn as spawn_guardian, DEFAULT_POLL_INTERVAL as DEFAULT_GUARDIAN_POLL_INTERVAL};
pub use hook::PostRunHook;
pub use lifecycle::{Invocation, InvokeMode, InvokeOutcome, LifecycleManager};
pub use secrets_store::SecretStore;
