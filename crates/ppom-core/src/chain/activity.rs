use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::{ChainActivityPolicy, ChainStatusEntry};
use crate::state::StateStore;

/// Bounded, time-aware record of recently used chains backed by the
/// controller state.
///
/// Every mutation is a single [`StateStore::update`], so concurrent callers
/// are serialized and readers only see whole updates.
#[derive(Clone)]
pub struct ChainActivityCache {
    state: Arc<StateStore>,
    policy: ChainActivityPolicy,
}

impl ChainActivityCache {
    #[must_use]
    pub fn new(state: Arc<StateStore>, policy: ChainActivityPolicy) -> Self {
        Self { state, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ChainActivityPolicy {
        &self.policy
    }

    /// Records a visit to `chain_id` now and makes it current.
    pub fn touch(&self, chain_id: &str) -> Option<String> {
        self.touch_at(chain_id, Utc::now())
    }

    pub fn touch_at(&self, chain_id: &str, now: DateTime<Utc>) -> Option<String> {
        let evicted =
            self.state.update(|state| state.chain_status.touch(chain_id, now, &self.policy));
        if let Some(evicted) = &evicted {
            info!(chain_id = %evicted, current = %chain_id, "chain evicted from activity cache");
        }
        evicted
    }

    /// Drops chains not visited within the retention window.
    pub fn prune(&self, now: DateTime<Utc>) -> Vec<String> {
        self.state.update(|state| state.chain_status.prune(now, &self.policy))
    }

    pub fn mark_fetched(&self, chain_id: &str) -> bool {
        self.state.update(|state| state.chain_status.mark_fetched(chain_id))
    }

    pub fn mark_needs_data(&self, chain_id: &str) -> bool {
        self.state.update(|state| state.chain_status.mark_needs_data(chain_id))
    }

    #[must_use]
    pub fn needs_data(&self, chain_id: &str) -> bool {
        self.state.snapshot().chain_status.needs_data(chain_id)
    }

    #[must_use]
    pub fn current_chain(&self) -> Option<String> {
        self.state.snapshot().chain_status.current().map(str::to_string)
    }

    #[must_use]
    pub fn is_tracked(&self, chain_id: &str) -> bool {
        self.state.snapshot().chain_status.contains(chain_id)
    }

    #[must_use]
    pub fn tracked_chains(&self) -> Vec<String> {
        self.state.snapshot().chain_status.chain_ids().map(str::to_string).collect()
    }

    #[must_use]
    pub fn entry(&self, chain_id: &str) -> Option<ChainStatusEntry> {
        self.state.snapshot().chain_status.get(chain_id).cloned()
    }
}
