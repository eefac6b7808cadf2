// src/controller.rs
//! Wires the matcher into a session and loads the store it consults.

use crate::config::DataConfig;
use crate::core::hook::{HookError, HookResult};
use crate::core::matcher::{decide, Verdict};
use crate::core::provider::{DataProvider, DirectoryProvider, HttpProvider};
use crate::core::script::ScriptConverter;
use crate::core::store::EquivalenceStore;
use crate::error::Result;
use crate::persistence::{load_snapshot, save_snapshot};
use crate::session::Session;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Filled at most once, when the store has loaded. Until then, and forever if
/// loading fails, the matcher has no opinion.
pub type StoreSlot = Arc<OnceLock<EquivalenceStore>>;

/// Registers the matcher on the submit hook and logging on the lifecycle hooks.
pub fn install<S: ScriptConverter>(session: &mut Session<S>, store: StoreSlot) {
    session.submit.register(move |payload, _| {
        let Some(store) = store.get() else {
            debug!("Store not loaded, skipping synonym check");
            return Ok(HookResult::Continue(Verdict::NoSynonymData));
        };

        match decide(&payload.question, &payload.answer, store) {
            Ok(Verdict::Reject) => Ok(HookResult::Veto),
            Ok(Verdict::AmbiguousTwin) => {
                info!(
                    primary = %payload.question.primary,
                    answer = %payload.answer,
                    "Ambiguous twin, check manually"
                );
                Ok(HookResult::Continue(Verdict::AmbiguousTwin))
            }
            Ok(verdict) => Ok(HookResult::Continue(verdict)),
            Err(err) => Err(HookError::new(err.to_string())),
        }
    });

    session.session_start.register(|_, _| {
        info!("Quiz session started");
        Ok(HookResult::Continue(()))
    });
    session.session_end.register(|_, _| {
        info!("Quiz session ended");
        Ok(HookResult::Continue(()))
    });
}

/// Loads the store from the snapshot if there is a readable one, otherwise from
/// the configured tables, refreshing the snapshot afterwards.
pub async fn load_store(config: &DataConfig) -> Result<EquivalenceStore> {
    if let Some(path) = &config.snapshot_path {
        match load_snapshot(path) {
            Ok(store) => {
                info!(path = %path.display(), "Loaded store from snapshot");
                return Ok(store);
            }
            Err(err) => debug!(path = %path.display(), error = %err, "No usable snapshot"),
        }
    }

    let provider: Box<dyn DataProvider> = match &config.local_dir {
        Some(dir) => Box::new(DirectoryProvider::new(dir)),
        None => Box::new(HttpProvider::new(config.base_url.clone())),
    };
    let store = EquivalenceStore::load(provider.as_ref()).await?;

    if let Some(path) = &config.snapshot_path {
        if let Err(err) = save_snapshot(&store, path) {
            warn!(path = %path.display(), error = %err, "Could not write snapshot");
        }
    }
    Ok(store)
}

/// Loads the store into `slot`. On failure the slot stays empty and the host
/// page keeps its own behaviour.
pub async fn populate(slot: &StoreSlot, config: &DataConfig) {
    match load_store(config).await {
        Ok(store) => {
            if slot.set(store).is_err() {
                warn!("Store was already loaded");
            }
        }
        Err(err) => warn!(error = %err, "Synonym data unavailable, passing submissions through"),
    }
}
