use futures::future::BoxFuture;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

use super::errors::ControllerError;
use crate::session::{EngineHandle, SessionError};

/// Remote name of the engine-use action.
pub const USE_PPOM_ACTION: &str = "PPOMController:usePPOM";
/// Remote name of the manifest-update action.
pub const UPDATE_PPOM_ACTION: &str = "PPOMController:updatePPOM";

/// Callback run against the engine by a remote caller.
pub type UseCallback =
    Box<dyn for<'a> FnOnce(&'a EngineHandle) -> BoxFuture<'a, Result<Value, SessionError>> + Send>;

type UpdateHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<(), SessionError>> + Send + Sync>;
type UseHandler =
    Arc<dyn Fn(UseCallback) -> BoxFuture<'static, Result<Value, SessionError>> + Send + Sync>;

enum ActionHandler {
    Update(UpdateHandler),
    Use(UseHandler),
}

/// Name → handler map through which remote callers reach the session.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandler>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_update<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn() -> BoxFuture<'static, Result<(), SessionError>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), ActionHandler::Update(Arc::new(handler)));
    }

    pub fn register_use<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(UseCallback) -> BoxFuture<'static, Result<Value, SessionError>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), ActionHandler::Use(Arc::new(handler)));
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// # Errors
    ///
    /// [`ControllerError::UnknownAction`] or [`ControllerError::ActionMismatch`]
    /// for a bad name, otherwise the session error.
    pub async fn call_update(&self, name: &str) -> Result<(), ControllerError> {
        match self.handlers.get(name) {
            Some(ActionHandler::Update(handler)) => Ok(handler().await?),
            Some(ActionHandler::Use(_)) => Err(ControllerError::ActionMismatch(name.to_string())),
            None => Err(ControllerError::UnknownAction(name.to_string())),
        }
    }

    /// # Errors
    ///
    /// [`ControllerError::UnknownAction`] or [`ControllerError::ActionMismatch`]
    /// for a bad name, otherwise the session error.
    pub async fn call_use(&self, name: &str, callback: UseCallback) -> Result<Value, ControllerError> {
        match self.handlers.get(name) {
            Some(ActionHandler::Use(handler)) => Ok(handler(callback).await?),
            Some(ActionHandler::Update(_)) => Err(ControllerError::ActionMismatch(name.to_string())),
            None => Err(ControllerError::UnknownAction(name.to_string())),
        }
    }
}
