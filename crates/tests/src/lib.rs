//! Integration Tests for PPOM Core
//!
//! This crate contains:
//!
//! - `controller_tests`: End-to-end controller scenarios over real HTTP against mocked servers
//! - `storage_tests`: Manifest reconciliation against the file-system backend
//! - `mock_infrastructure`: Reusable mocks for the CDN, the JSON-RPC provider and the engine
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod controller_tests;

#[cfg(test)]
mod storage_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
