// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Live-Update Bus: topic-keyed fan-out with a bounded,
//! drop-on-full queue per subscriber.
//!
//! One `mpsc` read republished to many per-subscriber `mpsc` queues
//! rather than a single forwarder. A full queue never blocks the
//! publisher — the subscriber is dropped instead.

use std::collections::HashMap;

use as_core::{SubscriberId, SubscriberSession, Topic};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::message::BusMessage;

struct Subscriber {
    session: SubscriberSession,
    sender: mpsc::Sender<BusMessage>,
}

#[derive(Default)]
struct BusInner {
    subscribers: HashMap<SubscriberId, Subscriber>,
    sequences: HashMap<Topic, u64>,
}

/// Process-wide publish/subscribe hub for catalog and run events.
#[derive(Default)]
pub struct Bus {
    inner: Mutex<BusInner>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber for `topics` with a bounded queue of
    /// `capacity` messages. The caller owns the receiver; dropping it (or
    /// letting the queue overflow) tears the subscription down.
    pub fn subscribe(&self, topics: Vec<Topic>, capacity: usize) -> (SubscriberId, mpsc::Receiver<BusMessage>) {
        let session = SubscriberSession::new(topics);
        let id = session.id;
        let (tx, rx) = mpsc::channel(capacity);
        self.inner.lock().subscribers.insert(id, Subscriber { session, sender: tx });
        (id, rx)
    }

    /// Explicitly tear down a subscription (client disconnect).
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.inner.lock().subscribers.remove(&id);
    }

    /// Publish `payload` on `topic`, assigning the next sequence number for
    /// that topic. Subscribers whose queue is full are dropped rather than
    /// awaited. Returns the assigned sequence number.
    pub fn publish(&self, topic: Topic, payload: serde_json::Value) -> u64 {
        let mut inner = self.inner.lock();

        let seq = {
            let counter = inner.sequences.entry(topic.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let message = BusMessage { topic: topic.clone(), seq, payload };

        let mut overflowed = Vec::new();
        for (id, subscriber) in inner.subscribers.iter() {
            if !subscriber.session.is_subscribed(&topic) {
                continue;
            }
            if subscriber.sender.try_send(message.clone()).is_err() {
                overflowed.push(*id);
            }
        }
        for id in overflowed {
            tracing::warn!(topic = %topic.wire_form(), "subscriber queue overflowed; dropping subscription");
            inner.subscribers.remove(&id);
        }

        seq
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
