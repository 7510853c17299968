//! Engine stand-in.
//!
//! `validate` expects `{"method", "params"}` and relays it through the
//! governor, so tests observe exactly what reaches the provider.

use async_trait::async_trait;
use parking_lot::Mutex;
use ppom_core::session::{Engine, EngineError, EngineFactory, EngineFile, RelayGovernor};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

struct RelayingEngine {
    relay: Arc<RelayGovernor>,
    freed: Arc<AtomicUsize>,
}

#[async_trait]
impl Engine for RelayingEngine {
    async fn validate(&self, request: Value) -> Result<Value, EngineError> {
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Validation("request has no method".to_string()))?;
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        Ok(self.relay.relay(method, params).await?)
    }

    fn free(self: Box<Self>) {
        self.freed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory recording the file set of every engine it builds.
#[derive(Default)]
pub struct RelayingEngineFactory {
    created: Mutex<Vec<Vec<EngineFile>>>,
    freed: Arc<AtomicUsize>,
}

impl RelayingEngineFactory {
    /// File sets passed to each constructed engine, oldest first.
    #[must_use]
    pub fn created(&self) -> Vec<Vec<EngineFile>> {
        self.created.lock().clone()
    }

    /// Number of engines released so far.
    #[must_use]
    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }
}

impl EngineFactory for RelayingEngineFactory {
    fn create(
        &self,
        relay: Arc<RelayGovernor>,
        files: Vec<EngineFile>,
    ) -> Result<Box<dyn Engine>, EngineError> {
        self.created.lock().push(files);
        Ok(Box::new(RelayingEngine { relay, freed: self.freed.clone() }))
    }
}
