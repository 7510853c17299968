//! Versioned controller state with a single-writer update path.
//!
//! `StateStore` is the one place where chain status, the last fetched
//! manifest, verified file metadata and the manifest revalidation token live.
//! Readers take wait-free snapshots; writers go through [`StateStore::update`],
//! which serializes mutations and publishes each one as a whole new snapshot,
//! so no reader ever observes a partially applied update.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

use crate::{
    chain::ChainStatusMap,
    storage::{MetadataReader, MetadataWriter},
    types::{FileDescriptor, FileMetadata},
};

/// Snapshot of everything the controller persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState {
    /// Incremented once per update that changed the state.
    pub version: u64,
    pub chain_status: ChainStatusMap,
    /// Last successfully fetched manifest.
    pub version_info: Vec<FileDescriptor>,
    /// Verified metadata for every file present in storage.
    pub storage_metadata: Vec<FileMetadata>,
    /// Revalidation token of the manifest in `version_info`.
    pub version_file_etag: Option<String>,
}

/// Shared controller state.
///
/// Hold it as `Arc<StateStore>`; every component that reads or writes
/// controller state gets a clone of the same `Arc`.
pub struct StateStore {
    state: ArcSwap<ControllerState>,
    write_lock: Mutex<()>,
    version_tx: watch::Sender<u64>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(ControllerState::default())
    }

    /// Creates a store seeded from previously persisted state.
    #[must_use]
    pub fn with_state(initial: ControllerState) -> Self {
        let (version_tx, _) = watch::channel(initial.version);
        Self { state: ArcSwap::from_pointee(initial), write_lock: Mutex::new(()), version_tx }
    }

    /// Returns the current snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<ControllerState> {
        self.state.load_full()
    }

    /// Applies `mutate` to a copy of the current state and publishes it.
    ///
    /// Updates are serialized. If `mutate` leaves the state unchanged nothing
    /// is published and the version stays the same.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut ControllerState) -> R) -> R {
        let _guard = self.write_lock.lock();

        let current = self.state.load_full();
        let mut next = (*current).clone();
        let result = mutate(&mut next);

        if next != *current {
            next.version = current.version + 1;
            let version = next.version;
            self.state.store(Arc::new(next));
            self.version_tx.send_replace(version);
            trace!(version, "controller state updated");
        }

        result
    }

    /// Subscribes to state version changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    /// Metadata callbacks that keep [`VerifiedStorage`](crate::storage::VerifiedStorage)
    /// metadata in `storage_metadata`.
    #[must_use]
    pub fn metadata_callbacks(self: &Arc<Self>) -> (MetadataReader, MetadataWriter) {
        let reader = {
            let store = Arc::clone(self);
            Arc::new(move || store.snapshot().storage_metadata.clone()) as MetadataReader
        };
        let writer = {
            let store = Arc::clone(self);
            Arc::new(move |entries: Vec<FileMetadata>| {
                store.update(|state| state.storage_metadata = entries);
            }) as MetadataWriter
        };
        (reader, writer)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
