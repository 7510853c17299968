//! # PPOM Core
//!
//! Integrity-verified data cache and synchronization engine for the PPOM
//! transaction analysis engine.
//!
//! This crate provides:
//!
//! - **[`integrity`]**: SHA-256 checksums and Ed25519 signature checks over data files.
//!
//! - **[`storage`]**: Pluggable blob backends behind a layer that only stores and returns
//!   verified content, with metadata reconciliation.
//!
//! - **[`manifest`]**: CDN manifest sync with `ETag` revalidation and verified file fetches.
//!
//! - **[`chain`]**: Bounded, time-pruned tracking of recently used chains.
//!
//! - **[`scheduler`]**: Eager fetches for the current chain and a paced background backlog.
//!
//! - **[`session`]**: Serialized engine lifecycle and the request-limited JSON-RPC relay.
//!
//! - **[`controller`]**: State, remote actions, and the builder wiring everything together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PpomController                        │
//! │  ┌───────────────┐  ┌────────────────┐  ┌─────────────────┐  │
//! │  │ ActionRegistry│─►│ EngineSession  │─►│ RelayGovernor   │──┼─► RpcProvider
//! │  └───────────────┘  └───────┬────────┘  └─────────────────┘  │
//! │                             │                                │
//! │                     ┌───────▼────────┐                       │
//! │                     │ FetchScheduler │                       │
//! │                     └───────┬────────┘                       │
//! │                     ┌───────▼────────┐  ┌─────────────────┐  │
//! │                     │  ManifestSync  │─►│ChainActivityCache│ │
//! │                     └───────┬────────┘  └─────────────────┘  │
//! │                     ┌───────▼────────┐  ┌─────────────────┐  │
//! │                     │VerifiedStorage │─►│ StorageBackend  │  │
//! │                     └────────────────┘  └─────────────────┘  │
//! │                        StateStore (single writer)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod config;
pub mod controller;
pub mod integrity;
pub mod manifest;
pub mod metrics;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;
