// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root and HTTP surface for the action execution core: wires
//! the run store, process pool, envelope codec, action catalog, and
//! live-update bus behind `axum`, and owns the data-directory lock and
//! package reload watch for the life of the process.

pub mod api;
pub mod config;
pub mod lifecycle;
pub mod state;

pub use config::Config;
pub use lifecycle::{startup, LifecycleError, StartupResult};
pub use state::AppState;
