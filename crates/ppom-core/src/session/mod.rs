//! Serialized access to the analysis engine.
//!
//! [`EngineSession`] owns the only engine handle. Every `update()` and
//! `use_engine()` call takes the same async mutex, so engine re-creation and
//! callbacks never overlap:
//!
//! ```text
//! Idle ──lock──► free old handle ──► eager fetch (if needed) ──► read files
//!   ▲                                                               │
//!   └──unlock◄── callback(&handle) settles ◄── create engine ◄──────┘
//! ```
//!
//! The handle stays in the slot after the callback returns and is freed at
//! the start of the next `use_engine()`.

pub mod engine;
pub mod errors;
pub mod relay;

pub use engine::{Engine, EngineFactory, EngineFile, EngineHandle};
pub use errors::{EngineError, RelayError, SessionError};
pub use relay::{
    HttpRpcProvider, HttpRpcProviderConfig, RelayGovernor, RpcProvider,
    DEFAULT_PROVIDER_REQUEST_LIMIT,
};

use futures::future::BoxFuture;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{manifest::ManifestSync, metrics, scheduler::FetchScheduler};

/// Owner of the engine handle and the lock around it.
pub struct EngineSession {
    sync: Arc<ManifestSync>,
    scheduler: Arc<FetchScheduler>,
    factory: Arc<dyn EngineFactory>,
    relay: Arc<RelayGovernor>,
    enabled: AtomicBool,
    engine: Mutex<Option<EngineHandle>>,
}

impl EngineSession {
    #[must_use]
    pub fn new(
        sync: Arc<ManifestSync>,
        scheduler: Arc<FetchScheduler>,
        factory: Arc<dyn EngineFactory>,
        relay: Arc<RelayGovernor>,
        enabled: bool,
    ) -> Self {
        Self {
            sync,
            scheduler,
            factory,
            relay,
            enabled: AtomicBool::new(enabled),
            engine: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flips the feature gate. Does not interrupt a call already holding the lock.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn relay(&self) -> &Arc<RelayGovernor> {
        &self.relay
    }

    fn ensure_enabled(&self) -> Result<(), SessionError> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(SessionError::FeatureDisabled)
        }
    }

    /// Syncs the manifest under the session lock and schedules any backlog.
    ///
    /// # Errors
    ///
    /// [`SessionError::FeatureDisabled`] without taking the lock, or the
    /// manifest sync failure.
    pub async fn update(&self) -> Result<(), SessionError> {
        self.ensure_enabled()?;
        let _slot = self.engine.lock().await;

        let backlog = self.sync.update_all().await?.into_backlog();
        if !backlog.is_empty() {
            self.scheduler.schedule_all_chains(backlog, self.scheduler.config().file_fetch_window);
        }
        Ok(())
    }

    /// Builds a fresh engine for the current chain and runs `callback` with it.
    ///
    /// The previous engine is freed first. If the current chain lacks data
    /// its files are fetched inline. The relay counter restarts at zero for
    /// each call. The lock is held until `callback` settles.
    ///
    /// # Errors
    ///
    /// - [`SessionError::FeatureDisabled`] without taking the lock
    /// - [`SessionError::CurrentChainFetch`] if the eager fetch fails
    /// - [`SessionError::NoDataForChain`] if no file is available
    /// - [`SessionError::Storage`] if a stored file fails verification
    /// - engine construction errors, or whatever `callback` returns
    pub async fn use_engine<T, F>(&self, callback: F) -> Result<T, SessionError>
    where
        F: for<'a> FnOnce(&'a EngineHandle) -> BoxFuture<'a, Result<T, SessionError>>,
    {
        self.ensure_enabled()?;
        let mut slot = self.engine.lock().await;

        if let Some(previous) = slot.take() {
            trace!(chain_id = %previous.chain_id(), "freeing previous engine");
            previous.free();
        }

        let chains = self.sync.chains();
        let chain_id = chains.current_chain().ok_or(SessionError::NoCurrentChain)?;

        if chains.needs_data(&chain_id) {
            self.scheduler
                .fetch_chain_now(&chain_id)
                .await
                .map_err(|source| SessionError::CurrentChainFetch { chain_id: chain_id.clone(), source })?;
        }

        let files = self.load_files(&chain_id).await?;
        if files.is_empty() {
            metrics::record_engine_session(false);
            return Err(SessionError::NoDataForChain { chain_id });
        }

        let file_count = files.len();
        self.relay.reset();
        let engine = self.factory.create(Arc::clone(&self.relay), files).map_err(|e| {
            metrics::record_engine_session(false);
            SessionError::from(e)
        })?;
        metrics::record_engine_session(true);
        debug!(chain_id = %chain_id, files = file_count, "engine created");

        let handle = slot.insert(EngineHandle::new(engine, chain_id, file_count));
        callback(handle).await
    }

    async fn load_files(&self, chain_id: &str) -> Result<Vec<EngineFile>, SessionError> {
        let storage = self.sync.storage();
        let mut files = Vec::new();
        for descriptor in self.sync.files_for_chain(chain_id) {
            match storage.read_file(&descriptor.name, chain_id).await {
                Ok(data) => files.push(EngineFile { name: descriptor.name, data }),
                Err(e) => {
                    warn!(file = %descriptor.key(), error = %e, "stored data file unusable");
                    self.sync.chains().mark_needs_data(chain_id);
                    return Err(e.into());
                }
            }
        }
        Ok(files)
    }

    /// Frees the current engine, waiting for any call holding the lock.
    pub async fn release(&self) {
        if let Some(handle) = self.engine.lock().await.take() {
            handle.free();
            info!("engine released");
        }
    }
}
