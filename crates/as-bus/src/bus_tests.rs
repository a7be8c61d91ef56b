// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn a_subscriber_receives_only_its_subscribed_topics() {
    let bus = Bus::new();
    let (_id, mut rx) = bus.subscribe(vec![Topic::Catalog], 4);

    bus.publish(Topic::Runs, serde_json::json!({"ignored": true}));
    bus.publish(Topic::Catalog, serde_json::json!({"reloaded": true}));

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.topic, Topic::Catalog);
    assert_eq!(msg.seq, 1);

    // The unrelated Runs publish never arrives.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn sequence_numbers_are_monotonic_per_topic() {
    let bus = Bus::new();
    let (_id, mut rx) = bus.subscribe(vec![Topic::Runs], 4);

    bus.publish(Topic::Runs, serde_json::json!(1));
    bus.publish(Topic::Runs, serde_json::json!(2));

    assert_eq!(rx.recv().await.unwrap().seq, 1);
    assert_eq!(rx.recv().await.unwrap().seq, 2);
}

#[tokio::test]
async fn topics_have_independent_sequence_counters() {
    let bus = Bus::new();
    bus.publish(Topic::Runs, serde_json::json!(1));
    bus.publish(Topic::Runs, serde_json::json!(2));
    let seq = bus.publish(Topic::Catalog, serde_json::json!(1));
    assert_eq!(seq, 1);
}

#[tokio::test]
async fn a_full_queue_drops_the_subscriber_instead_of_blocking() {
    let bus = Bus::new();
    let (_id, mut rx) = bus.subscribe(vec![Topic::Runs], 1);

    bus.publish(Topic::Runs, serde_json::json!(1));
    // Queue (capacity 1) is now full; this publish must not block, and
    // must drop the subscriber rather than wait for the receiver to drain.
    bus.publish(Topic::Runs, serde_json::json!(2));

    assert_eq!(bus.subscriber_count(), 0);
    // The first message is still in the channel even though the
    // subscription entry was torn down.
    assert_eq!(rx.recv().await.unwrap().seq, 1);
}

#[tokio::test]
async fn unsubscribe_removes_the_subscriber() {
    let bus = Bus::new();
    let (id, _rx) = bus.subscribe(vec![Topic::Runs], 4);
    assert_eq!(bus.subscriber_count(), 1);
    bus.unsubscribe(id);
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn multiple_subscribers_on_overlapping_topics_each_get_their_own_copy() {
    let bus = Bus::new();
    let (_a, mut rx_a) = bus.subscribe(vec![Topic::Runs, Topic::Catalog], 4);
    let (_b, mut rx_b) = bus.subscribe(vec![Topic::Runs], 4);

    bus.publish(Topic::Runs, serde_json::json!("hi"));

    assert_eq!(rx_a.recv().await.unwrap().seq, 1);
    assert_eq!(rx_b.recv().await.unwrap().seq, 1);
}
