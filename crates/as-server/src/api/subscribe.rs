// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /v1/subscribe?topics=runs,runs/<id>,catalog,config` — one snapshot
//! followed by a live delta stream, backed by the bus's bounded
//! per-subscriber queue.

use as_core::Topic;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::Stream;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub topics: String,
}

const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

pub async fn subscribe(State(state): State<AppState>, Query(q): Query<SubscribeQuery>) -> Result<Response, ApiError> {
    let topics: Vec<Topic> = q
        .topics
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(Topic::parse)
        .collect();

    if topics.is_empty() {
        return Err(as_core::ErrorKind::BadEnvelope("no valid topics in `topics` query parameter".to_string()).into());
    }

    let (subscriber_id, rx) = state.bus.subscribe(topics, SUBSCRIBER_QUEUE_CAPACITY);
    let bus = state.bus.clone();
    let stream = make_bus_stream(rx, subscriber_id, bus);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}

fn make_bus_stream(
    mut rx: tokio::sync::mpsc::Receiver<as_bus::BusMessage>,
    subscriber_id: as_core::SubscriberId,
    bus: std::sync::Arc<as_bus::Bus>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Some(message) => {
                    let data = serde_json::to_string(&message).unwrap_or_default();
                    yield Ok(Event::default().event(message.topic.wire_form()).id(message.seq.to_string()).data(data));
                }
                None => {
                    bus.unsubscribe(subscriber_id);
                    break;
                }
            }
        }
    }
}
