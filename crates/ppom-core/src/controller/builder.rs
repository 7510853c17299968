//! Builder wiring the controller's components from configuration.

use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    actions::{ActionRegistry, UPDATE_PPOM_ACTION, USE_PPOM_ACTION},
    errors::ControllerError,
    PpomController,
};
use crate::{
    chain::ChainActivityCache,
    config::AppConfig,
    manifest::{Fetcher, HttpFetcher, HttpFetcherConfig, ManifestSync},
    scheduler::FetchScheduler,
    session::{
        EngineFactory, EngineSession, HttpRpcProvider, HttpRpcProviderConfig, RelayGovernor,
        RpcProvider,
    },
    state::{ControllerState, StateStore},
    storage::{FileSystemStorage, InMemoryStorage, StorageBackend, VerifiedStorage},
};

/// Builder for constructing a [`PpomController`].
///
/// Only the configuration and the engine factory are mandatory. Storage
/// defaults to the configured data directory (or memory), the fetcher to
/// reqwest, and the provider to HTTP JSON-RPC against `session.rpc_url`.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use ppom_core::{config::AppConfig, controller::PpomController, session::EngineFactory};
/// # fn example(factory: Arc<dyn EngineFactory>) -> Result<(), Box<dyn std::error::Error>> {
/// let controller = PpomController::builder()
///     .with_config(AppConfig::load()?)
///     .with_engine_factory(factory)
///     .with_initial_chain("0x1")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PpomControllerBuilder {
    config: Option<AppConfig>,
    backend: Option<Arc<dyn StorageBackend>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    provider: Option<Arc<dyn RpcProvider>>,
    factory: Option<Arc<dyn EngineFactory>>,
    initial_state: Option<ControllerState>,
    initial_chain: Option<String>,
}

impl PpomControllerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_storage_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn with_rpc_provider(mut self, provider: Arc<dyn RpcProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Restores previously persisted controller state.
    #[must_use]
    pub fn with_initial_state(mut self, state: ControllerState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Marks `chain_id` as the current chain at startup.
    #[must_use]
    pub fn with_initial_chain(mut self, chain_id: impl Into<String>) -> Self {
        self.initial_chain = Some(chain_id.into());
        self
    }

    /// Builds the controller.
    ///
    /// When `session.security_alerts_enabled` is set the periodic sync is
    /// started, which requires a running tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] if the configuration is missing or
    /// invalid, a mandatory component is absent, or a default HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<PpomController, ControllerError> {
        let config = self.config.ok_or_else(|| {
            ControllerError::ConfigValidation("No configuration provided".to_string())
        })?;
        config.validate().map_err(ControllerError::ConfigValidation)?;
        let policy = config.chain_policy().map_err(ControllerError::ConfigValidation)?;

        let factory = self.factory.ok_or(ControllerError::MissingComponent("engine factory"))?;

        let provider: Arc<dyn RpcProvider> = match (self.provider, &config.session.rpc_url) {
            (Some(provider), _) => provider,
            (None, Some(url)) => Arc::new(
                HttpRpcProvider::new(HttpRpcProviderConfig::new(url.clone()))
                    .map_err(|e| ControllerError::Initialization(format!("RPC provider: {e}")))?,
            ),
            (None, None) => return Err(ControllerError::MissingComponent("rpc provider")),
        };

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                HttpFetcher::with_config(HttpFetcherConfig {
                    timeout: config.fetch_timeout(),
                    ..HttpFetcherConfig::default()
                })
                .map_err(|e| ControllerError::Initialization(format!("CDN fetcher: {e}")))?,
            ),
        };

        let backend: Arc<dyn StorageBackend> = match (self.backend, &config.storage.data_dir) {
            (Some(backend), _) => backend,
            (None, Some(dir)) => Arc::new(FileSystemStorage::new(dir.clone())),
            (None, None) => Arc::new(InMemoryStorage::new()),
        };

        info!(
            cdn = %config.cdn.base_url,
            security_alerts_enabled = config.session.security_alerts_enabled,
            provider_request_limit = config.session.provider_request_limit,
            "Initializing PPOM controller"
        );

        let state = Arc::new(match self.initial_state {
            Some(initial) => StateStore::with_state(initial),
            None => StateStore::new(),
        });

        let (read_metadata, write_metadata) = state.metadata_callbacks();
        let storage = Arc::new(VerifiedStorage::new(backend, read_metadata, write_metadata));
        let chains = ChainActivityCache::new(state.clone(), policy);
        if let Some(chain_id) = &self.initial_chain {
            chains.touch(chain_id);
        }

        let sync = Arc::new(ManifestSync::new(
            fetcher,
            storage.clone(),
            chains,
            state.clone(),
            config.cdn.base_url.clone(),
            config.cdn.public_key.clone(),
        ));
        let scheduler = Arc::new(FetchScheduler::new(sync.clone(), config.scheduler_config()));
        let relay = Arc::new(RelayGovernor::new(provider, config.session.provider_request_limit));
        let session = Arc::new(EngineSession::new(
            sync.clone(),
            scheduler.clone(),
            factory,
            relay,
            config.session.security_alerts_enabled,
        ));
        debug!("Engine session initialized");

        let actions = register_actions(&session);

        if config.session.security_alerts_enabled {
            scheduler.start_periodic(config.data_update_interval());
        }

        Ok(PpomController::new(config, state, storage, sync, scheduler, session, actions))
    }
}

fn register_actions(session: &Arc<EngineSession>) -> ActionRegistry {
    let mut actions = ActionRegistry::new();

    let update_session = Arc::clone(session);
    actions.register_update(UPDATE_PPOM_ACTION, move || {
        let session = Arc::clone(&update_session);
        async move { session.update().await }.boxed()
    });

    let use_session = Arc::clone(session);
    actions.register_use(USE_PPOM_ACTION, move |callback| {
        let session = Arc::clone(&use_session);
        async move { session.use_engine(callback).await }.boxed()
    });

    actions
}
