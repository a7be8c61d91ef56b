// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory, per-package secrets set out-of-band of any single
//! invocation. Never persisted: a restart clears it, same as the
//! managed-parameter environment-variable fallback it complements.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Secrets staged for a package, keyed by managed-parameter name. Always
/// loses to a value the envelope itself supplies for the same name.
#[derive(Default)]
pub struct SecretStore {
    by_package: Mutex<HashMap<String, HashMap<String, serde_json::Value>>>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the staged secrets for `package_slug` wholesale.
    pub fn set(&self, package_slug: &str, secrets: HashMap<String, serde_json::Value>) {
        self.by_package.lock().insert(package_slug.to_string(), secrets);
    }

    /// Secrets staged for `package_slug`, or an empty map if none were set.
    pub fn get(&self, package_slug: &str) -> HashMap<String, serde_json::Value> {
        self.by_package.lock().get(package_slug).cloned().unwrap_or_default()
    }
}
