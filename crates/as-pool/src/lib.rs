// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Process Pool and Environment Builder Adapter:
//! owns worker processes, dispatches calls over the `as-wire` protocol,
//! detects crashes, and evicts idle workers beyond the warm-pool floor.

mod env_builder;
mod error;
mod pool;
mod slot;
mod transient;

pub use env_builder::EnvironmentBuilderAdapter;
pub use error::PoolError;
pub use pool::{Pool, PoolConfig};
pub use slot::{WorkerRequest, DEFAULT_CANCEL_GRACE};
pub use transient::enumerate_actions;
