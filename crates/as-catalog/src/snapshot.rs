// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable Action Catalog snapshot and its atomic swap.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use as_core::{Action, ActionPackage};
use as_storage::RunStore;
use parking_lot::Mutex;

use crate::error::CatalogError;

/// One package's contribution to a snapshot: the package row plus its
/// currently-enabled actions.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub package: ActionPackage,
    pub actions: Vec<Action>,
}

/// A whole-catalog point-in-time view. Immutable once built; readers clone
/// the surrounding `Arc` rather than locking ("readers never
/// lock").
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    packages: HashMap<String, PackageEntry>,
}

impl CatalogSnapshot {
    pub fn package(&self, slug: &str) -> Option<&PackageEntry> {
        self.packages.get(slug)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values()
    }

    pub fn find_action(&self, package_slug: &str, action_slug: &str) -> Option<(&ActionPackage, &Action)> {
        let entry = self.packages.get(package_slug)?;
        let action = entry.actions.iter().find(|a| a.slug == action_slug)?;
        Some((&entry.package, action))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Operator-supplied package/action name filters applied during catalog
/// construction ("Whitelists"). `None` means unrestricted;
/// disabled actions stay in the database but are never served.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilters {
    pub packages: Option<HashSet<String>>,
    pub actions: Option<HashSet<String>>,
}

impl CatalogFilters {
    fn allows_package(&self, slug: &str) -> bool {
        self.packages.as_ref().is_none_or(|allowed| allowed.contains(slug))
    }

    fn allows_action(&self, slug: &str) -> bool {
        self.actions.as_ref().is_none_or(|allowed| allowed.contains(slug))
    }
}

/// Build a snapshot from the current contents of the run store, applying
/// `filters` ("rebuilt from the Run Store at startup").
pub fn rebuild_snapshot(store: &RunStore, filters: &CatalogFilters) -> Result<CatalogSnapshot, CatalogError> {
    let mut packages = HashMap::new();
    for package in store.list_packages()? {
        if !package.enabled || !filters.allows_package(&package.slug) {
            continue;
        }
        let actions: Vec<Action> = store
            .list_enabled_actions_for_package(&package.id)?
            .into_iter()
            .filter(|action| filters.allows_action(&action.slug))
            .collect();
        packages.insert(package.slug.clone(), PackageEntry { package, actions });
    }
    Ok(CatalogSnapshot { packages })
}

/// Owns the live snapshot pointer. Construct once; share behind an `Arc`
/// alongside the rest of the server's composition root.
pub struct Catalog {
    filters: CatalogFilters,
    current: Mutex<Arc<CatalogSnapshot>>,
}

impl Catalog {
    pub fn new(filters: CatalogFilters) -> Self {
        Self { filters, current: Mutex::new(Arc::new(CatalogSnapshot::default())) }
    }

    /// The currently live snapshot. Cheap: a lock only around an `Arc`
    /// clone, never around the snapshot's contents.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current.lock().clone()
    }

    /// Rebuild from `store` and atomically swap it in as the live
    /// snapshot.
    pub fn rebuild(&self, store: &RunStore) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let snapshot = Arc::new(rebuild_snapshot(store, &self.filters)?);
        *self.current.lock() = Arc::clone(&snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
