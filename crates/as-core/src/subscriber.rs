// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live-update bus topics and subscriber identity.

use serde::{Deserialize, Serialize};

use crate::id::SubscriberId;

/// A bus topic. `Run(id)` is the fine-grained per-run topic
/// (`runs/<id>` on the wire); the others are process-wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Runs,
    Run(String),
    Catalog,
    Config,
}

impl Topic {
    /// Parse the wire form (`"runs"`, `"runs/<id>"`, `"catalog"`, `"config"`).
    pub fn parse(s: &str) -> Option<Topic> {
        if s == "runs" {
            Some(Topic::Runs)
        } else if let Some(id) = s.strip_prefix("runs/") {
            Some(Topic::Run(id.to_string()))
        } else if s == "catalog" {
            Some(Topic::Catalog)
        } else if s == "config" {
            Some(Topic::Config)
        } else {
            None
        }
    }

    pub fn wire_form(&self) -> String {
        match self {
            Topic::Runs => "runs".to_string(),
            Topic::Run(id) => format!("runs/{id}"),
            Topic::Catalog => "catalog".to_string(),
            Topic::Config => "config".to_string(),
        }
    }
}

/// Bus-owned record of a connected subscriber (the queue itself lives in
/// `as-bus`; this is the addressable identity plus its selected topics and
/// sequence cursor).
#[derive(Debug, Clone)]
pub struct SubscriberSession {
    pub id: SubscriberId,
    pub topics: Vec<Topic>,
    pub cursor: u64,
}

impl SubscriberSession {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self { id: SubscriberId::new(), topics, cursor: 0 }
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_topic_with_id() {
        assert_eq!(Topic::parse("runs/run-abc"), Some(Topic::Run("run-abc".to_string())));
    }

    #[test]
    fn parses_process_wide_topics() {
        assert_eq!(Topic::parse("runs"), Some(Topic::Runs));
        assert_eq!(Topic::parse("catalog"), Some(Topic::Catalog));
        assert_eq!(Topic::parse("config"), Some(Topic::Config));
    }

    #[test]
    fn rejects_unknown_topic() {
        assert_eq!(Topic::parse("bogus"), None);
    }

    #[test]
    fn wire_form_round_trips() {
        let topic = Topic::Run("run-xyz".to_string());
        assert_eq!(Topic::parse(&topic.wire_form()), Some(topic));
    }

    #[test]
    fn session_tracks_subscribed_topics() {
        let session = SubscriberSession::new(vec![Topic::Catalog]);
        assert!(session.is_subscribed(&Topic::Catalog));
        assert!(!session.is_subscribed(&Topic::Runs));
    }
}
