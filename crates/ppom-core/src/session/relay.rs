use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, trace};

use super::errors::RelayError;
use crate::{metrics, types::is_method_allowed};

/// Default cap on relayed calls per engine session.
pub const DEFAULT_PROVIDER_REQUEST_LIMIT: usize = 300;

/// JSON-RPC provider the engine's chain queries are relayed to.
#[async_trait]
pub trait RpcProvider: Send + Sync {
    /// Sends one request and returns its `result`.
    async fn send(&self, method: &str, params: Value) -> Result<Value, RelayError>;
}

/// Gatekeeper between the engine and the provider.
///
/// Counts every call made in the current session. Calls past the limit are
/// rejected first, then methods outside the read-only allow-list; neither
/// reaches the provider.
pub struct RelayGovernor {
    provider: Arc<dyn RpcProvider>,
    limit: usize,
    calls: AtomicUsize,
}

impl RelayGovernor {
    #[must_use]
    pub fn new(provider: Arc<dyn RpcProvider>, limit: usize) -> Self {
        Self { provider, limit, calls: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls made since the last reset.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Starts a new session.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// # Errors
    ///
    /// - [`RelayError::RequestLimitExceeded`] once the session made more than
    ///   `limit` calls
    /// - [`RelayError::MethodNotAllowed`] for methods outside the allow-list
    /// - whatever the provider returns
    pub async fn relay(&self, method: &str, params: Value) -> Result<Value, RelayError> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.limit {
            metrics::record_relay_request("limit_exceeded");
            debug!(method, count, limit = self.limit, "relay request limit exceeded");
            return Err(RelayError::RequestLimitExceeded { limit: self.limit });
        }

        if !is_method_allowed(method) {
            metrics::record_relay_request("method_not_allowed");
            debug!(method, "relay method not allowed");
            return Err(RelayError::MethodNotAllowed { method: method.to_string() });
        }

        let result = self.provider.send(method, params).await;
        metrics::record_relay_request(if result.is_ok() { "forwarded" } else { "provider_error" });
        result
    }
}

/// Configuration for [`HttpRpcProvider`].
#[derive(Debug, Clone)]
pub struct HttpRpcProviderConfig {
    pub url: String,
    pub timeout: Duration,
}

impl HttpRpcProviderConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), timeout: Duration::from_secs(10) }
    }
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpRpcProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcProvider {
    /// # Errors
    ///
    /// Returns [`RelayError::Provider`] if the HTTP client fails to build.
    pub fn new(config: HttpRpcProviderConfig) -> Result<Self, RelayError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| RelayError::Provider(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client, url: config.url, next_id: AtomicU64::new(1) })
    }

    fn sanitize_network_error(error: &reqwest::Error) -> RelayError {
        let reason = if error.is_timeout() {
            "request timed out"
        } else if error.is_connect() {
            "connection refused or unreachable"
        } else if error.is_decode() {
            "malformed response"
        } else {
            "network error"
        };
        RelayError::Provider(reason.to_string())
    }
}

#[async_trait]
impl RpcProvider for HttpRpcProvider {
    async fn send(&self, method: &str, params: Value) -> Result<Value, RelayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::sanitize_network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            trace!(status = status.as_u16(), method, "provider request failed");
            return Err(RelayError::Provider(format!("HTTP {}", status.as_u16())));
        }

        let mut payload: Value =
            response.json().await.map_err(|e| Self::sanitize_network_error(&e))?;

        if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32603);
            let message =
                error.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string();
            return Err(RelayError::Rpc { code, message });
        }

        payload
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| RelayError::Provider("response has no result".to_string()))
    }
}
