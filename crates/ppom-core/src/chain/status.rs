//! Chain status records: which chains were visited recently and whether
//! their data files are present.
//!
//! [`ChainStatusMap`] is plain data with pure operations; it is stored inside
//! the controller state and mutated only through
//! [`crate::state::StateStore::update`] by [`super::ChainActivityCache`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Status of a single tracked chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatusEntry {
    pub chain_id: String,
    pub last_visited: DateTime<Utc>,
    pub data_fetched: bool,
}

/// Bounds applied when adding and pruning chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainActivityPolicy {
    /// Maximum number of tracked chains.
    pub max_tracked: usize,
    /// Pruning never reduces the tracked set below this size.
    pub min_tracked: usize,
    /// Chains not visited for longer than this are pruned.
    pub retention: Duration,
}

impl Default for ChainActivityPolicy {
    fn default() -> Self {
        Self { max_tracked: 5, min_tracked: 2, retention: Duration::days(7) }
    }
}

/// Tracked chains keyed by chain id, plus the current-chain pointer.
///
/// # Invariants
///
/// - at most `max_tracked` entries after any `touch`
/// - `prune` leaves at least `min_tracked` entries
/// - the current chain always has an entry and is never evicted or pruned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatusMap {
    current: Option<String>,
    entries: HashMap<String, ChainStatusEntry>,
}

impl ChainStatusMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    #[must_use]
    pub fn get(&self, chain_id: &str) -> Option<&ChainStatusEntry> {
        self.entries.get(chain_id)
    }

    #[must_use]
    pub fn contains(&self, chain_id: &str) -> bool {
        self.entries.contains_key(chain_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked chain ids, in no particular order.
    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChainStatusEntry> {
        self.entries.values()
    }

    /// Records a visit to `chain_id` and makes it the current chain.
    ///
    /// A no-op if `chain_id` already is the current chain. When a new chain
    /// would exceed `max_tracked`, the least recently visited other chain is
    /// evicted first. Ties between equal timestamps resolve in map iteration
    /// order, which is unspecified.
    ///
    /// Returns the evicted chain id, if any.
    pub fn touch(
        &mut self,
        chain_id: &str,
        now: DateTime<Utc>,
        policy: &ChainActivityPolicy,
    ) -> Option<String> {
        if self.current.as_deref() == Some(chain_id) {
            return None;
        }

        let mut evicted = None;
        if !self.entries.contains_key(chain_id) &&
            self.entries.len() >= policy.max_tracked &&
            self.entries.len() > policy.min_tracked
        {
            evicted = self
                .entries
                .values()
                .filter(|entry| entry.chain_id != chain_id)
                .min_by_key(|entry| entry.last_visited)
                .map(|entry| entry.chain_id.clone());
            if let Some(oldest) = &evicted {
                self.entries.remove(oldest);
                debug!(chain_id = %oldest, "evicted least recently visited chain");
            }
        }

        let data_fetched = self.entries.get(chain_id).is_some_and(|entry| entry.data_fetched);
        self.entries.insert(
            chain_id.to_string(),
            ChainStatusEntry { chain_id: chain_id.to_string(), last_visited: now, data_fetched },
        );
        self.current = Some(chain_id.to_string());
        trace!(chain_id = %chain_id, "chain visited");

        evicted
    }

    /// Removes chains not visited within `policy.retention`, keeping the
    /// current chain and never going below `policy.min_tracked` entries.
    ///
    /// Returns the removed chain ids.
    pub fn prune(&mut self, now: DateTime<Utc>, policy: &ChainActivityPolicy) -> Vec<String> {
        if self.entries.len() <= policy.min_tracked {
            return Vec::new();
        }

        let mut expired: Vec<&ChainStatusEntry> = self
            .entries
            .values()
            .filter(|entry| Some(entry.chain_id.as_str()) != self.current.as_deref())
            .filter(|entry| now - entry.last_visited > policy.retention)
            .collect();
        expired.sort_by_key(|entry| entry.last_visited);

        let removable = self.entries.len() - policy.min_tracked;
        let removed: Vec<String> =
            expired.into_iter().take(removable).map(|entry| entry.chain_id.clone()).collect();

        for chain_id in &removed {
            self.entries.remove(chain_id);
            debug!(chain_id = %chain_id, "pruned inactive chain");
        }
        removed
    }

    /// Marks `chain_id` as having all its data. Returns `true` if the flag changed.
    pub fn mark_fetched(&mut self, chain_id: &str) -> bool {
        match self.entries.get_mut(chain_id) {
            Some(entry) if !entry.data_fetched => {
                entry.data_fetched = true;
                true
            }
            _ => false,
        }
    }

    /// Clears the fetched flag. Returns `true` if the flag changed.
    pub fn mark_needs_data(&mut self, chain_id: &str) -> bool {
        match self.entries.get_mut(chain_id) {
            Some(entry) if entry.data_fetched => {
                entry.data_fetched = false;
                true
            }
            _ => false,
        }
    }

    /// `true` if the chain is untracked or its data has not been fetched.
    #[must_use]
    pub fn needs_data(&self, chain_id: &str) -> bool {
        self.entries.get(chain_id).map_or(true, |entry| !entry.data_fetched)
    }
}
