//! Mock Infrastructure for Testing PPOM Core
//!
//! This module provides reusable mock types so tests exercise the real HTTP
//! fetcher and provider without external services.
//!
//! ## Components
//!
//! - `CdnMockBuilder`: Wraps mockito to serve a signed manifest and data files
//! - `RpcMockBuilder`: Wraps mockito to answer JSON-RPC methods
//! - `RelayingEngineFactory`: Engine stand-in that relays requests to the provider
//! - Test helpers for signing and controller setup
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{signed_descriptor, CdnMockBuilder};
//!
//! let mut cdn = CdnMockBuilder::new().await;
//! let descriptor = signed_descriptor("blocklist", "0x1", b"rules");
//! cdn.mock_manifest(&[descriptor.clone()], "\"v1\"").await;
//! cdn.mock_file(&descriptor, b"rules").await;
//! ```

pub mod cdn_mock;
pub mod engine_mock;
pub mod rpc_mock;
pub mod test_helpers;

pub use cdn_mock::{CdnMockBuilder, ManifestMocks};
pub use engine_mock::RelayingEngineFactory;
pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
