// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action package and action metadata.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::{ActionId, ActionPackageId};
use crate::managed_param::ManagedParamKind;

/// An imported package of actions.
///
/// Identity is the slugified package name; `directory` plus `manifest_hash`
/// together locate and key the prepared [`crate::Environment`] for this
/// package. Disabled (not deleted) when its directory disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPackage {
    pub id: ActionPackageId,
    /// ASCII slug, `-` replacing any other separator found in the manifest name.
    pub slug: String,
    pub directory: PathBuf,
    /// Content hash of the manifest's environment-relevant fields; doubles
    /// as the environment key passed to the builder adapter.
    pub manifest_hash: String,
    /// Endpoints the package declares it talks to (informational only).
    pub declared_endpoints: Vec<String>,
    pub enabled: bool,
}

impl ActionPackage {
    /// Slugify a raw package name: lowercase ASCII, any run of
    /// non-alphanumeric characters collapsed to a single `-`.
    pub fn slugify(name: &str) -> String {
        let mut slug = String::with_capacity(name.len());
        let mut last_was_dash = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_was_dash = false;
            } else if !last_was_dash && !slug.is_empty() {
                slug.push('-');
                last_was_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }
}

/// The kind of callable surface an action is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Action,
    Query,
    Predict,
    Tool,
    Resource,
    Prompt,
}

crate::simple_display! {
    ToolKind {
        Action => "action",
        Query => "query",
        Predict => "predict",
        Tool => "tool",
        Resource => "resource",
        Prompt => "prompt",
    }
}

/// A single action within a package.
///
/// Identity is `(package_id, slug)`. Rewritten atomically on package
/// (re)import; exactly one `Action` exists per `(package, slug)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub package_id: ActionPackageId,
    pub slug: String,
    pub display_name: String,
    /// Structural, JSON-Schema-shaped input description.
    pub input_schema: serde_json::Value,
    /// Structural, JSON-Schema-shaped output description.
    pub output_schema: serde_json::Value,
    /// Which parameters are managed, and by which kind: stored by kind,
    /// not by language type.
    pub managed_params: HashMap<String, ManagedParamKind>,
    pub consequential: bool,
    pub source_file: PathBuf,
    pub source_line: u32,
    pub tool_kind: ToolKind,
}

impl Action {
    /// Parameter names the codec must resolve before dispatch, in a stable
    /// order (sorted by name) so the same action always enumerates its
    /// managed parameters identically.
    pub fn managed_param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.managed_params.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
