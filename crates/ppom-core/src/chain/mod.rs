//! Chain activity tracking.
//!
//! Keeps a small set of recently used chains, each with a flag telling
//! whether all of its data files are present locally. The set is bounded:
//!
//! ```text
//!                 touch(new chain)
//!   ┌──────────────────────────────────────────┐
//!   │ len == max_tracked?  ── yes ──► evict oldest lastVisited (not incoming)
//!   │        │ no
//!   │        ▼
//!   │ insert/refresh entry, keep dataFetched, set current
//!   └──────────────────────────────────────────┘
//!
//!                 prune(now)
//!   len <= min_tracked? ── yes ──► no-op
//!          │ no
//!          ▼
//!   drop entries older than retention, never the current chain,
//!   never below min_tracked
//! ```
//!
//! [`ChainStatusMap`] holds the data and the pure operations;
//! [`ChainActivityCache`] applies them through the shared
//! [`crate::state::StateStore`].

pub mod activity;
pub mod status;

pub use activity::ChainActivityCache;
pub use status::{ChainActivityPolicy, ChainStatusEntry, ChainStatusMap};
