// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transient, single-use worker launched by the Import Subsystem to
//! enumerate a package's actions. Unlike a pooled
//! [`crate::Slot`] it is never reused and never dispatched a `Request`.

use as_core::WorkerSlotId;
use as_wire::DiscoveredAction;

use crate::error::PoolError;
use crate::slot::Slot;

/// Spawn `command`, ask the resulting worker to enumerate its actions, then
/// terminate it regardless of outcome.
pub async fn enumerate_actions(command: &[String]) -> Result<Vec<DiscoveredAction>, PoolError> {
    let mut slot = Slot::spawn(WorkerSlotId(0), command).await?;
    let result = slot.enumerate().await;
    slot.terminate().await;
    result
}

#[cfg(test)]
#[path = "transient_tests.rs"]
mod tests;
