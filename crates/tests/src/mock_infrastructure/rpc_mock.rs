//! RPC Mock Builder for Ethereum JSON-RPC Testing
//!
//! Wraps mockito to answer the methods the engine relays.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for creating mock Ethereum RPC responses.
pub struct RpcMockBuilder {
    server: ServerGuard,
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Answers `method` with `result`, expecting exactly `hits` requests.
    pub async fn mock_method(&mut self, method: &str, result: &Value, hits: usize) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Mocks an `eth_blockNumber` request.
    pub async fn mock_block_number(&mut self, block_number: u64, hits: usize) -> Mock {
        self.mock_method("eth_blockNumber", &json!(format!("0x{block_number:x}")), hits).await
    }

    /// Answers `method` with a JSON-RPC error object.
    pub async fn mock_error(&mut self, method: &str, code: i64, message: &str) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": code, "message": message }
                })
                .to_string(),
            )
            .create_async()
            .await
    }
}
