use thiserror::Error;

use crate::session::SessionError;

/// Errors raised while building or driving a [`super::PpomController`].
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// A required collaborator was not supplied to the builder
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),

    /// Generic initialization error
    #[error("Controller initialization failed: {0}")]
    Initialization(String),

    /// No action is registered under the name
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The action exists but takes a different kind of call
    #[error("Action {0} cannot be called this way")]
    ActionMismatch(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
