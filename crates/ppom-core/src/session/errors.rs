use serde_json::{json, Value};
use thiserror::Error;

use crate::{manifest::ManifestError, storage::StorageError};

/// JSON-RPC error code for a request over the per-session cap.
pub const LIMIT_EXCEEDED_CODE: i64 = -32005;
/// JSON-RPC error code for a method outside the allow-list.
pub const METHOD_NOT_SUPPORTED_CODE: i64 = -32601;
const INTERNAL_ERROR_CODE: i64 = -32603;

/// Rejections and failures of a relayed provider call.
///
/// The display strings are the JSON-RPC messages handed back to the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Limit exceeded")]
    RequestLimitExceeded { limit: usize },

    #[error("Method not supported")]
    MethodNotAllowed { method: String },

    /// The provider answered with a JSON-RPC error object.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    /// The provider could not be reached or sent an unusable response.
    #[error("provider error: {0}")]
    Provider(String),
}

impl RelayError {
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::RequestLimitExceeded { .. } => LIMIT_EXCEEDED_CODE,
            Self::MethodNotAllowed { .. } => METHOD_NOT_SUPPORTED_CODE,
            Self::Rpc { code, .. } => *code,
            Self::Provider(_) => INTERNAL_ERROR_CODE,
        }
    }

    /// JSON-RPC error object for this failure.
    #[must_use]
    pub fn to_json_rpc(&self) -> Value {
        json!({ "code": self.code(), "message": self.to_string() })
    }
}

/// Failures reported by the analysis engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine construction failed: {0}")]
    Construction(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Errors surfaced by [`super::EngineSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The security alerts feature is switched off.
    #[error("security alerts are disabled")]
    FeatureDisabled,

    /// No chain has been selected yet.
    #[error("no current chain selected")]
    NoCurrentChain,

    /// The manifest lists no usable file for the chain.
    #[error("no data files available for chain {chain_id}")]
    NoDataForChain { chain_id: String },

    /// The eager fetch for the current chain failed.
    #[error("failed to fetch data for chain {chain_id}: {source}")]
    CurrentChainFetch {
        chain_id: String,
        #[source]
        source: ManifestError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Engine failure, including relay rejections raised inside the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
