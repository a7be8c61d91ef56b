// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed parameter kinds: an explicit tagged variant rather than
//! runtime-reflected types, so the execution path is pure table lookup.

use serde::{Deserialize, Serialize};

/// The kind of value the server must resolve for an action parameter,
/// rather than passing it through verbatim from the input payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedParamKind {
    /// A plain secret value, resolved from the envelope or an `X-`/env fallback.
    Secret,
    /// An OAuth2 access token, resolved the same way as `Secret`.
    OAuth2Secret,
    /// A handle to the originating HTTP request (headers, forwarded context).
    Request,
    /// A handle to a configured data-server connection.
    DataSource,
}

crate::simple_display! {
    ManagedParamKind {
        Secret => "secret",
        OAuth2Secret => "oauth2_secret",
        Request => "request",
        DataSource => "data_source",
    }
}

impl ManagedParamKind {
    /// Whether resolving this kind requires decrypting/looking up a secret
    /// value (as opposed to being supplied purely from request context).
    pub fn is_secret_like(self) -> bool {
        matches!(self, ManagedParamKind::Secret | ManagedParamKind::OAuth2Secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_and_oauth2_are_secret_like() {
        assert!(ManagedParamKind::Secret.is_secret_like());
        assert!(ManagedParamKind::OAuth2Secret.is_secret_like());
        assert!(!ManagedParamKind::Request.is_secret_like());
        assert!(!ManagedParamKind::DataSource.is_secret_like());
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(ManagedParamKind::Secret.to_string(), "secret");
        assert_eq!(ManagedParamKind::OAuth2Secret.to_string(), "oauth2_secret");
    }
}
