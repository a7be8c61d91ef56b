// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Live-Update Bus: a process-wide publish/subscribe hub
//! that fans catalog-reload and run-lifecycle events out to connected
//! clients over bounded, drop-on-full per-subscriber queues.

mod bus;
mod message;

pub use bus::Bus;
pub use message::BusMessage;
