use async_trait::async_trait;
use serde_json::Value;
use std::{fmt, sync::Arc};

use super::{errors::EngineError, relay::RelayGovernor};

/// One verified data file handed to the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for EngineFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFile").field("name", &self.name).field("len", &self.data.len()).finish()
    }
}

/// A constructed analysis engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Validates a transaction request.
    async fn validate(&self, request: Value) -> Result<Value, EngineError>;

    /// Releases the engine's resources. Called exactly once per instance.
    fn free(self: Box<Self>);
}

/// Builds engines from a relay and a set of data files.
pub trait EngineFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`EngineError::Construction`] if the engine rejects the files.
    fn create(
        &self,
        relay: Arc<RelayGovernor>,
        files: Vec<EngineFile>,
    ) -> Result<Box<dyn Engine>, EngineError>;
}

/// Uniquely owned engine instance.
///
/// The engine is freed when the handle is freed or dropped, whichever
/// comes first.
pub struct EngineHandle {
    engine: Option<Box<dyn Engine>>,
    chain_id: String,
    files: usize,
}

impl EngineHandle {
    pub(crate) fn new(engine: Box<dyn Engine>, chain_id: String, files: usize) -> Self {
        Self { engine: Some(engine), chain_id, files }
    }

    /// Chain the loaded data files belong to.
    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Number of data files the engine was built with.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// # Errors
    ///
    /// Whatever the engine reports.
    pub async fn validate(&self, request: Value) -> Result<Value, EngineError> {
        match &self.engine {
            Some(engine) => engine.validate(request).await,
            None => Err(EngineError::Validation("engine already freed".to_string())),
        }
    }

    pub fn free(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.free();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("chain_id", &self.chain_id)
            .field("files", &self.files)
            .field("freed", &self.engine.is_none())
            .finish()
    }
}
