// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level envelope grammar shared between the HTTP layer and the
//! codec. Decryption itself lives in `as-envelope`; this
//! crate only describes the shapes.

use serde::{Deserialize, Serialize};

/// An AEAD-ciphered envelope payload, base64-decoded by the caller before
/// constructing this (the base64 wrapper is a transport detail, not part
/// of the JSON grammar).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CipherEnvelope {
    /// Base64 ciphertext.
    pub cipher: String,
    /// Always `"aes256-gcm"` today; kept as a string so a future algorithm
    /// can be added without breaking older clients.
    pub algorithm: String,
    /// Base64 initialization vector / nonce.
    pub iv: String,
    /// Base64 AEAD authentication tag.
    #[serde(rename = "auth-tag")]
    pub auth_tag: String,
}

/// The composite body mode: when the request signals "invocation context
/// in body," the body is this three-key map instead of the raw action
/// input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeBody {
    #[serde(default, rename = "action-context")]
    pub action_context: Option<serde_json::Value>,
    #[serde(default, rename = "data-context")]
    pub data_context: Option<serde_json::Value>,
    pub body: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_envelope_rejects_unknown_fields() {
        let json = serde_json::json!({
            "cipher": "abc",
            "algorithm": "aes256-gcm",
            "iv": "def",
            "auth-tag": "ghi",
            "extra": "nope",
        });
        let result: Result<CipherEnvelope, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn composite_body_preserves_inner_payload_verbatim() {
        let json = serde_json::json!({
            "action-context": {"secrets": {"pw": "x"}, "future_field": 1},
            "body": {"name": "Ada"},
        });
        let decoded: CompositeBody = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.action_context.unwrap()["future_field"], 1);
        assert_eq!(decoded.data_context, None);
    }
}
