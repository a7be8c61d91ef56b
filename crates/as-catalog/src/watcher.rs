// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reload Watcher: watches the packages
//! root for source/manifest changes, debounces, and invokes a callback
//! that re-runs the Import Subsystem and swaps in a new catalog snapshot.
//!
//! Built on `notify::recommended_watcher` plus a forwarding channel,
//! debounced across a directory tree rather than a single file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::CatalogError;

/// Default coalescing window between a filesystem event and re-running the
/// Import Subsystem ("default ~500 ms").
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type ChangeCallback = Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Watches `packages_root` for changes under any package directory to
/// files named `*.py`, `*.pyx`, or `*.yaml`, debounces them, then invokes
/// `on_change`. Holds the underlying OS watch handle alive for its
/// lifetime.
pub struct ReloadWatcher {
    _watcher: RecommendedWatcher,
}

impl ReloadWatcher {
    pub fn spawn(packages_root: PathBuf, debounce: Duration, on_change: ChangeCallback) -> Result<Self, CatalogError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if event_touches_source(&event) {
                    let _ = tx.send(());
                }
            }
        })?;
        watcher.watch(&packages_root, RecursiveMode::Recursive)?;

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Coalesce a burst of edits (e.g. an editor's save-then-
                // rewrite sequence) into one reimport.
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                on_change().await;
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

fn event_touches_source(event: &Event) -> bool {
    event.paths.iter().any(is_watched_file)
}

fn is_watched_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("py") | Some("pyx") | Some("yaml"))
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
