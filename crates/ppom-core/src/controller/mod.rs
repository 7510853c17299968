//! Host-facing entry points.
//!
//! [`PpomController`] owns every component and exposes the operations a host
//! calls: the feature switch, network changes, and the two remote actions
//! dispatched through the [`ActionRegistry`].

pub mod actions;
pub mod builder;
pub mod errors;

pub use actions::{ActionRegistry, UseCallback, UPDATE_PPOM_ACTION, USE_PPOM_ACTION};
pub use builder::PpomControllerBuilder;
pub use errors::ControllerError;

use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    manifest::ManifestSync,
    scheduler::FetchScheduler,
    session::EngineSession,
    state::StateStore,
    storage::VerifiedStorage,
};

pub struct PpomController {
    config: AppConfig,
    state: Arc<StateStore>,
    storage: Arc<VerifiedStorage>,
    sync: Arc<ManifestSync>,
    scheduler: Arc<FetchScheduler>,
    session: Arc<EngineSession>,
    actions: ActionRegistry,
    shutdown_initiated: AtomicBool,
}

impl PpomController {
    #[must_use]
    pub fn builder() -> PpomControllerBuilder {
        PpomControllerBuilder::new()
    }

    pub(super) fn new(
        config: AppConfig,
        state: Arc<StateStore>,
        storage: Arc<VerifiedStorage>,
        sync: Arc<ManifestSync>,
        scheduler: Arc<FetchScheduler>,
        session: Arc<EngineSession>,
        actions: ActionRegistry,
    ) -> Self {
        Self {
            config,
            state,
            storage,
            sync,
            scheduler,
            session,
            actions,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<VerifiedStorage> {
        &self.storage
    }

    #[must_use]
    pub fn sync(&self) -> &Arc<ManifestSync> {
        &self.sync
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<FetchScheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn session(&self) -> &Arc<EngineSession> {
        &self.session
    }

    /// Registry remote callers dispatch through.
    #[must_use]
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Turns the feature on or off.
    ///
    /// Enabling starts the periodic sync with an immediate first run;
    /// disabling cancels it and any pending background fetches. A call
    /// already holding the session lock is not interrupted.
    pub fn set_security_alerts_enabled(&self, enabled: bool) {
        self.session.set_enabled(enabled);
        if enabled {
            self.scheduler.start_periodic(self.config.data_update_interval());
        } else {
            self.scheduler.stop();
        }
        info!(enabled, "security alerts preference changed");
    }

    /// Records a visit to `chain_id` and makes it current.
    ///
    /// Returns the chain evicted to make room, if any.
    pub fn on_network_change(&self, chain_id: &str) -> Option<String> {
        debug!(chain_id, "network changed");
        self.sync.chains().touch(chain_id)
    }

    /// Runs `callback` against a fresh engine for the current chain.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Session`] with the session failure.
    pub async fn use_ppom(&self, callback: UseCallback) -> Result<Value, ControllerError> {
        self.actions.call_use(USE_PPOM_ACTION, callback).await
    }

    /// Syncs the manifest and schedules background fetches.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Session`] with the session failure.
    pub async fn update_ppom(&self) -> Result<(), ControllerError> {
        self.actions.call_update(UPDATE_PPOM_ACTION).await
    }

    /// Stops background work and frees the engine. Idempotent.
    pub async fn shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            debug!("shutdown already initiated");
            return;
        }

        info!("Shutting down PPOM controller");
        self.scheduler.stop();
        self.session.release().await;
        info!("PPOM controller shutdown complete");
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }
}
