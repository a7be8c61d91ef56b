// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level envelope decode pipeline: composite body detection,
//! `x-action-context` decrypt-or-plain, then the invocation-context header.
//! Per-secret header/env resolution lives in [`crate::secrets`] and is
//! invoked by the caller once it knows an action's declared managed params.

use std::collections::HashMap;

use as_core::ErrorKind;
use as_wire::CompositeBody;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::crypto::DecryptKeys;
use crate::envelope::InvocationEnvelope;

/// The raw, HTTP-level inputs the codec needs. Header keys must already be
/// lower-cased by the caller (header matching is case-insensitive at the
/// wire but we don't want to re-derive that here).
#[derive(Debug, Clone)]
pub struct RequestParts {
    /// True when the request signalled "invocation context in body".
    pub composite_body: bool,
    pub body: serde_json::Value,
    pub headers: HashMap<String, String>,
}

impl RequestParts {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActionContextPayload {
    #[serde(default)]
    secrets: HashMap<String, serde_json::Value>,
    #[serde(default)]
    oauth2: HashMap<String, serde_json::Value>,
}

/// Base64-decode a header value, then either decrypt it (if it parses as a
/// [`as_wire::CipherEnvelope`]) or take it plain. Falls back to treating
/// the raw string as a bare scalar value when it isn't valid base64/JSON at
/// all -- most `X-<p>` secret headers and env vars are just opaque tokens,
/// not envelopes.
pub(crate) fn decode_scalar(raw: &str, decrypt_keys: &DecryptKeys) -> Result<serde_json::Value, ErrorKind> {
    let Ok(bytes) = BASE64.decode(raw) else {
        return Ok(serde_json::Value::String(raw.to_string()));
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Ok(serde_json::Value::String(raw.to_string()));
    };
    resolve_maybe_ciphered(value, decrypt_keys)
}

/// Resolve a JSON value that may itself be a [`as_wire::CipherEnvelope`]
/// (from composite-body mode, where the context arrives as a nested JSON
/// object rather than a base64 header string).
fn resolve_maybe_ciphered(value: serde_json::Value, decrypt_keys: &DecryptKeys) -> Result<serde_json::Value, ErrorKind> {
    if let serde_json::Value::String(s) = &value {
        return decode_scalar(s, decrypt_keys);
    }
    if let Ok(envelope) = serde_json::from_value::<as_wire::CipherEnvelope>(value.clone()) {
        let plaintext = decrypt_keys.try_decrypt(&envelope)?;
        return serde_json::from_slice(&plaintext)
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid plaintext json: {e}")));
    }
    Ok(value)
}

fn resolve_optional(value: Option<serde_json::Value>, decrypt_keys: &DecryptKeys) -> Result<Option<serde_json::Value>, ErrorKind> {
    value.map(|v| resolve_maybe_ciphered(v, decrypt_keys)).transpose()
}

/// Decode a request into its action input payload and resolved
/// [`InvocationEnvelope`]. Per-secret resolution is applied later by the
/// caller via [`crate::secrets::resolve_managed_param`].
pub fn decode_envelope(
    parts: &RequestParts,
    decrypt_keys: &DecryptKeys,
) -> Result<(serde_json::Value, InvocationEnvelope), ErrorKind> {
    let (input_payload, action_context_raw, data_context_raw) = if parts.composite_body {
        let composite: CompositeBody = serde_json::from_value(parts.body.clone())
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid composite body: {e}")))?;
        (composite.body, composite.action_context, composite.data_context)
    } else {
        let action_context = parts.header("x-action-context").map(|s| serde_json::Value::String(s.to_string()));
        let data_context = parts.header("x-data-context").map(|s| serde_json::Value::String(s.to_string()));
        (parts.body.clone(), action_context, data_context)
    };

    let action_context = resolve_optional(action_context_raw, decrypt_keys)?;
    let data_context = resolve_optional(data_context_raw, decrypt_keys)?;

    let action_context_payload: ActionContextPayload = match action_context {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid action-context payload: {e}")))?,
        None => ActionContextPayload::default(),
    };

    let invocation_context = match parts.header("x-action-invocation-context") {
        Some(raw) => {
            let value = decode_scalar(raw, decrypt_keys)?;
            serde_json::from_value(value)
                .map_err(|e| ErrorKind::BadEnvelope(format!("invalid invocation-context payload: {e}")))?
        }
        None => HashMap::new(),
    };

    let async_timeout_secs = parts
        .header("x-actions-async-timeout")
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| ErrorKind::BadEnvelope("x-actions-async-timeout must be an integer".into()))
        })
        .transpose()?;

    let envelope = InvocationEnvelope {
        secrets: action_context_payload.secrets,
        oauth2_tokens: action_context_payload.oauth2,
        data_context,
        invocation_context,
        forwarded_headers: parts.headers.clone(),
        async_timeout_secs,
        async_callback_url: parts.header("x-actions-async-callback").map(str::to_string),
        request_id: parts.header("x-actions-request-id").map(str::to_string),
    };

    Ok((input_payload, envelope))
}
