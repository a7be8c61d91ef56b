// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Envelope codec: decodes the composite per-request invocation envelope
//! into a typed [`InvocationEnvelope`], optionally decrypting
//! it, and resolves managed parameters into typed values.
//!
//! The codec never logs secret material: [`InvocationEnvelope`]'s `Debug`
//! impl is hand-written and redacts every secret/oauth2 value.

mod codec;
mod crypto;
mod envelope;
mod secrets;

pub use codec::{decode_envelope, RequestParts};
pub use crypto::DecryptKeys;
pub use envelope::InvocationEnvelope;
pub use secrets::{merge_secret_sources, resolve_managed_param, SecretSource};
