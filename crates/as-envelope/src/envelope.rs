// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed result of decoding a request's envelope.

use std::collections::HashMap;
use std::fmt;

/// Per-request metadata resolved from the composite envelope: secrets,
/// OAuth2 tokens, data-server handle, async hints, forwarded headers, and
/// the free-form invocation context used by the post-run hook.
///
/// `Debug` is hand-written below and redacts every secret/oauth2 value;
/// nothing in this type should ever reach a log line unredacted.
#[derive(Clone, Default)]
pub struct InvocationEnvelope {
    pub(crate) secrets: HashMap<String, serde_json::Value>,
    pub(crate) oauth2_tokens: HashMap<String, serde_json::Value>,
    pub data_context: Option<serde_json::Value>,
    pub invocation_context: HashMap<String, String>,
    pub forwarded_headers: HashMap<String, String>,
    pub async_timeout_secs: Option<u64>,
    pub async_callback_url: Option<String>,
    pub request_id: Option<String>,
}

impl InvocationEnvelope {
    pub fn secret(&self, name: &str) -> Option<&serde_json::Value> {
        self.secrets.get(name)
    }

    pub fn oauth2_token(&self, name: &str) -> Option<&serde_json::Value> {
        self.oauth2_tokens.get(name)
    }

    pub fn set_secret(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.secrets.insert(name.into(), value);
    }

    pub fn set_oauth2_token(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.oauth2_tokens.insert(name.into(), value);
    }

    pub fn secret_names(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }

    pub fn oauth2_names(&self) -> impl Iterator<Item = &str> {
        self.oauth2_tokens.keys().map(String::as_str)
    }
}

impl fmt::Debug for InvocationEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted_secrets: HashMap<&str, &str> =
            self.secrets.keys().map(|k| (k.as_str(), "<redacted>")).collect();
        let redacted_oauth2: HashMap<&str, &str> =
            self.oauth2_tokens.keys().map(|k| (k.as_str(), "<redacted>")).collect();
        f.debug_struct("InvocationEnvelope")
            .field("secrets", &redacted_secrets)
            .field("oauth2_tokens", &redacted_oauth2)
            .field("data_context", &self.data_context)
            .field("invocation_context", &self.invocation_context)
            .field("forwarded_headers", &self.forwarded_headers)
            .field("async_timeout_secs", &self.async_timeout_secs)
            .field("async_callback_url", &self.async_callback_url)
            .field("request_id", &self.request_id)
            .finish()
    }
}
