// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The envelope delivered to every bus subscriber.

use as_core::Topic;
use serde::{Deserialize, Serialize};

/// One delta on one topic. `seq` is monotonic per topic so a reconnecting
/// client can detect gaps against the sequence cursor it last saw
/// (mirrors the run store's `processed_seq`, repurposed for delivery
/// rather than durability).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: Topic,
    pub seq: u64,
    pub payload: serde_json::Value,
}
