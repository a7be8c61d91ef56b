// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use as_bus::Bus;
use as_catalog::{validate_packages_root, Catalog, CatalogFilters, Importer, ReloadWatcher, DEFAULT_DEBOUNCE};
use as_core::{Clock, SystemClock};
use as_envelope::DecryptKeys;
use as_pool::{EnvironmentBuilderAdapter, Pool, PoolConfig};
use as_storage::{DataDirLock, RunStore};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

use super::{LifecycleError, StartupResult};

pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    // 1. Lock the data directory before touching anything else in it, so a
    // failed acquire never races another holder's files.
    std::fs::create_dir_all(&config.home)?;
    let lock = DataDirLock::acquire(&config.lock_path)?;
    std::fs::create_dir_all(&config.runs_path)?;
    std::fs::create_dir_all(&config.packages_root)?;
    validate_packages_root(&config.packages_root)?;

    // 2. Open the run store and recover from a previous crash: anything
    // left non-terminal could not possibly still be running.
    let store = Arc::new(RunStore::open(&config.db_path)?);
    let recovered = store.reset_non_terminal_to_cancelled(SystemClock.epoch_ms())?;
    if recovered > 0 {
        warn!(recovered, "cancelled non-terminal runs left over from a previous crash");
    }

    // 3. Build the import/catalog stack and run an initial import.
    let builder = Arc::new(EnvironmentBuilderAdapter::new(config.builder_cmd.clone()));
    let importer = Importer::new(&store, &builder);
    let (imported, diagnostics) = importer.import_all(&config.packages_root).await;
    for diag in &diagnostics {
        warn!(package = %diag.package, message = %diag.message, "import diagnostic");
    }
    info!(packages = imported.len(), "imported action packages");

    let catalog = Arc::new(Catalog::new(CatalogFilters::default()));
    catalog.rebuild(&store)?;

    // 4. Watch the packages root and re-import on change, publishing a
    // catalog-change notification on the bus.
    let bus = Arc::new(Bus::new());
    let watch_store = Arc::clone(&store);
    let watch_builder = Arc::clone(&builder);
    let watch_catalog = Arc::clone(&catalog);
    let watch_packages_root = config.packages_root.clone();
    let watch_bus = Arc::clone(&bus);
    let watcher = ReloadWatcher::spawn(
        config.packages_root.clone(),
        DEFAULT_DEBOUNCE,
        Box::new(move || {
            let store = Arc::clone(&watch_store);
            let builder = Arc::clone(&watch_builder);
            let catalog = Arc::clone(&watch_catalog);
            let packages_root = watch_packages_root.clone();
            let bus = Arc::clone(&watch_bus);
            Box::pin(async move {
                let importer = Importer::new(&store, &builder);
                let (imported, diagnostics) = importer.import_all(&packages_root).await;
                for diag in &diagnostics {
                    warn!(package = %diag.package, message = %diag.message, "reload diagnostic");
                }
                match catalog.rebuild(&store) {
                    Ok(_) => {
                        info!(packages = imported.len(), "reloaded action packages");
                        bus.publish(as_core::Topic::Catalog, serde_json::json!({"packages": imported}));
                    }
                    Err(e) => warn!(error = %e, "catalog rebuild failed after reload"),
                }
            })
        }),
    )?;
    let watcher = Arc::new(watcher);

    // 5. Decryption keys, pool, post-run hook, engine.
    let decrypt_keys = DecryptKeys::from_base64_list(config.decrypt_key_list()?)?;
    let pool = Arc::new(Pool::new(PoolConfig::default()));
    let post_run_hook = config.post_run_cmd.as_deref().and_then(as_engine::PostRunHook::new).map(Arc::new);

    let manager = Arc::new(as_engine::LifecycleManager::new(
        Arc::clone(&store),
        Arc::clone(&pool),
        Arc::clone(&catalog),
        Arc::clone(&bus),
        Arc::clone(&builder),
        decrypt_keys.clone(),
        post_run_hook,
        config.runs_path.clone(),
    ));

    if let Some(parent_pid) = config.parent_pid {
        as_engine::spawn_guardian(parent_pid, crate::config::guardian_poll_interval(), Arc::clone(&pool), as_pool::DEFAULT_CANCEL_GRACE);
    }

    let api_token_hash = config.api_token.as_deref().map(|token| -> Arc<[u8]> { Arc::from(Sha256::digest(token.as_bytes()).as_slice()) });

    // 6. Bind last -- only after every other validation and recovery step
    // has succeeded.
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.bind_addr.clone(), e))?;
    info!(addr = %config.bind_addr, "action server listening");

    Ok(StartupResult {
        state: AppState {
            config: Arc::new(config),
            manager,
            catalog,
            bus,
            decrypt_keys: Arc::new(decrypt_keys),
            api_token_hash,
            _lock: Arc::new(lock),
            _watcher: watcher,
        },
        listener,
    })
}
