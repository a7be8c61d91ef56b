// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package manifest parsing and environment-key hashing.

use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The manifest file name every action package is expected to declare
/// ("derived from package manifest"; reload watches `*.yaml`
/// alongside it).
pub const MANIFEST_FILE_NAME: &str = "package.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Environment-relevant fields (dependency pins, runtime version).
    /// Hashed verbatim to produce the environment key — never interpreted
    /// by this crate, which treats the environment builder as opaque.
    #[serde(default)]
    pub dependencies: serde_yaml::Value,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse `<dir>/package.yaml`. A missing manifest is not an error — the
/// directory is simply ignored by the caller.
pub fn load_manifest(dir: &Path) -> Result<Option<PackageManifest>, ManifestError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    let manifest: PackageManifest = serde_yaml::from_str(&raw)?;
    Ok(Some(manifest))
}

/// Hash the manifest's environment-relevant fields to obtain the
/// environment key the builder adapter and process pool key off of.
pub fn environment_key(manifest: &PackageManifest) -> String {
    let canonical = serde_json::to_vec(&manifest.dependencies).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
