// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AEAD decryption for `x-action-context`-style envelopes.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use as_core::ErrorKind;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use as_wire::CipherEnvelope;

/// The server's configured list of decrypt keys, tried in order until one
/// authenticates.
#[derive(Clone)]
pub struct DecryptKeys(Vec<[u8; 32]>);

impl DecryptKeys {
    /// Build from a list of base64-encoded 32-byte AES-256 keys (the shape
    /// of `ACTION_SERVER_DECRYPT_KEYS`).
    pub fn from_base64_list(keys: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self, ErrorKind> {
        let mut decoded = Vec::new();
        for raw in keys {
            let bytes = BASE64
                .decode(raw.as_ref())
                .map_err(|e| ErrorKind::BadEnvelope(format!("invalid decrypt key: {e}")))?;
            let key: [u8; 32] = bytes
                .try_into()
                .map_err(|_| ErrorKind::BadEnvelope("decrypt key must be 32 bytes".into()))?;
            decoded.push(key);
        }
        Ok(Self(decoded))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Try every configured key in order; return the first successful
    /// plaintext. `ErrorKind::DecryptFailed` on exhaustion.
    pub fn try_decrypt(&self, envelope: &CipherEnvelope) -> Result<Vec<u8>, ErrorKind> {
        if envelope.algorithm != "aes256-gcm" {
            return Err(ErrorKind::BadEnvelope(format!(
                "unsupported cipher algorithm: {}",
                envelope.algorithm
            )));
        }

        let ciphertext = BASE64
            .decode(&envelope.cipher)
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid cipher base64: {e}")))?;
        let iv = BASE64
            .decode(&envelope.iv)
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid iv base64: {e}")))?;
        let tag = BASE64
            .decode(&envelope.auth_tag)
            .map_err(|e| ErrorKind::BadEnvelope(format!("invalid auth-tag base64: {e}")))?;

        if iv.len() != 12 {
            return Err(ErrorKind::BadEnvelope("iv must be 12 bytes for aes256-gcm".into()));
        }

        let mut combined = ciphertext;
        combined.extend_from_slice(&tag);
        let nonce = Nonce::from_slice(&iv);

        for key_bytes in &self.0 {
            let key = Key::<Aes256Gcm>::from_slice(key_bytes);
            let cipher = Aes256Gcm::new(key);
            if let Ok(plaintext) = cipher.decrypt(nonce, combined.as_ref()) {
                return Ok(plaintext);
            }
        }

        Err(ErrorKind::DecryptFailed)
    }
}

/// Test-only helpers shared with `codec` and `secrets` tests so every
/// envelope-shaped fixture in this crate is built the same way.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use aes_gcm::aead::OsRng;
    use aes_gcm::AeadCore;

    pub(crate) fn random_key() -> [u8; 32] {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        key.into()
    }

    pub(crate) fn encrypt(key_bytes: &[u8; 32], plaintext: &[u8]) -> CipherEnvelope {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let combined = cipher.encrypt(&nonce, plaintext).unwrap();
        let (ct, tag) = combined.split_at(combined.len() - 16);
        CipherEnvelope {
            cipher: BASE64.encode(ct),
            algorithm: "aes256-gcm".to_string(),
            iv: BASE64.encode(nonce),
            auth_tag: BASE64.encode(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{encrypt, random_key};
    use super::*;

    #[test]
    fn decrypts_with_the_matching_key() {
        let key = random_key();
        let envelope = encrypt(&key, br#"{"secrets":{"pw":"hunter2"}}"#);
        let keys = DecryptKeys(vec![key]);
        let plaintext = keys.try_decrypt(&envelope).unwrap();
        assert_eq!(plaintext, br#"{"secrets":{"pw":"hunter2"}}"#);
    }

    #[test]
    fn tries_each_configured_key_in_order() {
        let wrong_key = random_key();
        let right_key = random_key();
        let envelope = encrypt(&right_key, b"hello");
        let keys = DecryptKeys(vec![wrong_key, right_key]);
        assert_eq!(keys.try_decrypt(&envelope).unwrap(), b"hello");
    }

    #[test]
    fn exhausting_all_keys_fails_with_decrypt_failed() {
        let key_a = random_key();
        let key_b = random_key();
        let envelope = encrypt(&key_a, b"secret");
        let keys = DecryptKeys(vec![key_b]);
        assert_eq!(keys.try_decrypt(&envelope), Err(ErrorKind::DecryptFailed));
    }

    #[test]
    fn rejects_unsupported_algorithm() {
        let envelope = CipherEnvelope {
            cipher: BASE64.encode(b"x"),
            algorithm: "rot13".to_string(),
            iv: BASE64.encode([0u8; 12]),
            auth_tag: BASE64.encode([0u8; 16]),
        };
        let keys = DecryptKeys(vec![random_key()]);
        assert!(matches!(keys.try_decrypt(&envelope), Err(ErrorKind::BadEnvelope(_))));
    }
}
