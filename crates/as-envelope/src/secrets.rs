// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-secret header/env resolution and secrets-override precedence.

use std::collections::HashMap;

use as_core::{ErrorKind, ManagedParamKind};

use crate::codec::decode_scalar;
use crate::crypto::DecryptKeys;
use crate::envelope::InvocationEnvelope;

/// Where a resolved managed-parameter value came from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Envelope,
    Header,
    Environment,
}

/// `X-Foo-Bar` from a parameter named `foo_bar`: underscores become
/// dashes, matched case-insensitively.
fn header_name_for(param: &str) -> String {
    format!("x-{}", param.replace('_', "-"))
}

/// `FOO_BAR` from a parameter named `foo_bar`.
fn env_name_for(param: &str) -> String {
    param.to_uppercase()
}

/// Resolve one declared `Secret`/`OAuth2Secret` managed parameter: envelope
/// first, then the `X-<p>` header, then the `<P_UPPER>` environment
/// variable. Returns `Ok(None)` if nothing supplied a value; callers decide
/// whether that's a hard failure.
pub fn resolve_managed_param(
    name: &str,
    kind: ManagedParamKind,
    envelope: &InvocationEnvelope,
    headers: &HashMap<String, String>,
    decrypt_keys: &DecryptKeys,
) -> Result<Option<(serde_json::Value, SecretSource)>, ErrorKind> {
    if !kind.is_secret_like() {
        return Ok(None);
    }

    let from_envelope = match kind {
        ManagedParamKind::Secret => envelope.secret(name),
        ManagedParamKind::OAuth2Secret => envelope.oauth2_token(name),
        _ => None,
    };
    if let Some(value) = from_envelope {
        return Ok(Some((value.clone(), SecretSource::Envelope)));
    }

    let header_name = header_name_for(name);
    let from_header = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(&header_name))
        .map(|(_, v)| v.as_str());
    if let Some(raw) = from_header {
        let value = decode_scalar(raw, decrypt_keys)?;
        return Ok(Some((value, SecretSource::Header)));
    }

    let env_name = env_name_for(name);
    if let Ok(raw) = std::env::var(&env_name) {
        let value = decode_scalar(&raw, decrypt_keys)?;
        return Ok(Some((value, SecretSource::Environment)));
    }

    Ok(None)
}

/// Merge the side-channel "set secrets in memory" map into an envelope's
/// secrets, without overwriting anything the envelope itself supplied:
/// the per-request envelope always wins over the side channel.
pub fn merge_secret_sources(
    envelope: &mut InvocationEnvelope,
    side_channel_secrets: &HashMap<String, serde_json::Value>,
) {
    for (name, value) in side_channel_secrets {
        if envelope.secret(name).is_none() {
            envelope.set_secret(name.clone(), value.clone());
        }
    }
}
