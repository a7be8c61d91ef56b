// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Import Subsystem: manifest parse, environment key
//! hash, builder adapter, transient enumerate-mode worker, lint, and a
//! transactional rewrite of the package's rows in the run store.

use std::path::Path;

use as_core::{Action, ActionId, ActionPackage, ActionPackageId};
use as_pool::EnvironmentBuilderAdapter;
use as_storage::RunStore;
use as_wire::DiscoveredAction;

use crate::manifest::{self, ManifestError};

/// A per-package or per-action failure recorded instead of aborting the
/// whole import run: diagnostics accumulate per-package without aborting
/// the rest of the import.
#[derive(Debug, Clone)]
pub struct ImportDiagnostic {
    pub package: String,
    pub message: String,
}

impl ImportDiagnostic {
    fn new(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self { package: package.into(), message: message.into() }
    }
}

/// Runs the Import Subsystem against one packages root. Borrowed rather
/// than owned so the caller can share the same store/builder with the
/// rest of the server.
pub struct Importer<'a> {
    store: &'a RunStore,
    builder: &'a EnvironmentBuilderAdapter,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a RunStore, builder: &'a EnvironmentBuilderAdapter) -> Self {
        Self { store, builder }
    }

    /// Import every subdirectory of `packages_root`. Returns the slugs of
    /// packages successfully imported and every diagnostic encountered;
    /// never returns early on a single package's failure.
    pub async fn import_all(&self, packages_root: &Path) -> (Vec<String>, Vec<ImportDiagnostic>) {
        let mut imported = Vec::new();
        let mut diagnostics = Vec::new();

        let entries = match std::fs::read_dir(packages_root) {
            Ok(entries) => entries,
            Err(e) => {
                diagnostics.push(ImportDiagnostic::new(
                    packages_root.display().to_string(),
                    format!("cannot read packages root: {e}"),
                ));
                return (imported, diagnostics);
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match self.import_package(&path, &mut diagnostics).await {
                Ok(Some(slug)) => imported.push(slug),
                Ok(None) => {}
                Err(diag) => diagnostics.push(diag),
            }
        }

        if let Err(e) = self.disable_missing_packages(&imported) {
            diagnostics.push(ImportDiagnostic::new(
                packages_root.display().to_string(),
                format!("failed to disable missing packages: {e}"),
            ));
        }

        (imported, diagnostics)
    }

    /// Import a single package directory: parse the manifest, hash its
    /// environment-relevant fields, enumerate its actions, and persist
    /// both. `Ok(None)` means the directory has no manifest and was
    /// silently ignored.
    pub async fn import_package(
        &self,
        dir: &Path,
        diagnostics: &mut Vec<ImportDiagnostic>,
    ) -> Result<Option<String>, ImportDiagnostic> {
        let label = dir.display().to_string();

        let manifest = match manifest::load_manifest(dir) {
            Ok(Some(m)) => m,
            Ok(None) => return Ok(None),
            Err(ManifestError::Io(e)) => {
                return Err(ImportDiagnostic::new(label, format!("cannot read manifest: {e}")))
            }
            Err(ManifestError::Yaml(e)) => {
                return Err(ImportDiagnostic::new(label, format!("malformed manifest: {e}")))
            }
        };

        let slug = ActionPackage::slugify(&manifest.name);
        let env_key = manifest::environment_key(&manifest);

        let environment = self
            .builder
            .ensure(&env_key, dir)
            .await
            .map_err(|e| ImportDiagnostic::new(&slug, format!("environment build failed: {e}")))?;

        let discovered = as_pool::enumerate_actions(&environment.worker_command)
            .await
            .map_err(|e| ImportDiagnostic::new(&slug, format!("action enumeration failed: {e}")))?;

        let existing_id = self
            .store
            .get_package_by_slug(&slug)
            .map_err(|e| ImportDiagnostic::new(&slug, format!("storage error: {e}")))?
            .map(|existing| existing.id);

        let package = ActionPackage {
            id: existing_id.unwrap_or_else(ActionPackageId::new),
            slug: slug.clone(),
            directory: dir.to_path_buf(),
            manifest_hash: env_key,
            declared_endpoints: manifest.endpoints.clone(),
            enabled: true,
        };

        self.store
            .upsert_package(&package)
            .map_err(|e| ImportDiagnostic::new(&slug, format!("storage error: {e}")))?;

        let actions = lint_actions(&slug, discovered, package.id, diagnostics);

        self.store
            .replace_package_actions(&package.id, &actions)
            .map_err(|e| ImportDiagnostic::new(&slug, format!("storage error: {e}")))?;

        Ok(Some(slug))
    }

    /// Disable (not delete) every currently-enabled package whose
    /// directory no longer produced a successful import this run.
    fn disable_missing_packages(&self, current_slugs: &[String]) -> Result<(), as_storage::StorageError> {
        for package in self.store.list_packages()? {
            if package.enabled && !current_slugs.contains(&package.slug) {
                self.store.upsert_package(&ActionPackage { enabled: false, ..package })?;
            }
        }
        Ok(())
    }
}

/// Reject actions whose signatures aren't representable in the
/// input-schema language, recording a diagnostic and skipping just that
/// action rather than the whole package.
fn lint_actions(
    package_slug: &str,
    discovered: Vec<DiscoveredAction>,
    package_id: ActionPackageId,
    diagnostics: &mut Vec<ImportDiagnostic>,
) -> Vec<Action> {
    let mut actions = Vec::with_capacity(discovered.len());
    for d in discovered {
        if let Err(reason) = validate_schema_shape(&d.input_schema) {
            diagnostics.push(ImportDiagnostic::new(
                package_slug,
                format!("action '{}' rejected: {reason}", d.slug),
            ));
            continue;
        }
        actions.push(Action {
            id: ActionId::new(),
            package_id,
            slug: ActionPackage::slugify(&d.slug),
            display_name: d.display_name,
            input_schema: d.input_schema,
            output_schema: d.output_schema,
            managed_params: d.managed_params,
            consequential: d.consequential,
            source_file: d.source_file,
            source_line: d.source_line,
            tool_kind: d.tool_kind,
        });
    }
    actions
}

fn validate_schema_shape(schema: &serde_json::Value) -> Result<(), &'static str> {
    let Some(obj) = schema.as_object() else {
        return Err("input schema must be a JSON object");
    };
    if let Some(ty) = obj.get("type") {
        if ty != "object" {
            return Err("input schema's top-level type must be 'object'");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
