//! Checksum-gated façade over a [`StorageBackend`].

use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::{StorageBackend, StorageError};
use crate::{
    integrity, metrics,
    types::{FileDescriptor, FileKey, FileMetadata},
};

/// Reads the current verified metadata set.
pub type MetadataReader = Arc<dyn Fn() -> Vec<FileMetadata> + Send + Sync>;

/// Persists the whole verified metadata set.
pub type MetadataWriter = Arc<dyn Fn(Vec<FileMetadata>) + Send + Sync>;

/// A data file to be stored together with the metadata describing it.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub data: Vec<u8>,
    pub name: String,
    pub chain_id: String,
    pub version: String,
    pub checksum: String,
}

impl WriteRequest {
    /// Builds a write request for data fetched for `descriptor`.
    #[must_use]
    pub fn for_descriptor(descriptor: &FileDescriptor, data: Vec<u8>) -> Self {
        Self {
            data,
            name: descriptor.name.clone(),
            chain_id: descriptor.chain_id.clone(),
            version: descriptor.version.clone(),
            checksum: descriptor.checksum.clone(),
        }
    }
}

/// Storage layer that never stores or returns unverified content.
///
/// Owns the mapping from file identity to verified metadata. The metadata
/// itself lives wherever the injected reader/writer put it (normally the
/// controller state), so it survives as long as the host persists it.
///
/// # Concurrency
///
/// Writes and reconciliation are serialized by an internal async mutex. A
/// write that lands while `sync_metadata` is running waits for it, so the
/// reconciliation never garbage-collects a blob that was written after it
/// took its metadata snapshot.
pub struct VerifiedStorage {
    backend: Arc<dyn StorageBackend>,
    read_metadata: MetadataReader,
    write_metadata: MetadataWriter,
    write_lock: Mutex<()>,
}

impl VerifiedStorage {
    #[must_use]
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        read_metadata: MetadataReader,
        write_metadata: MetadataWriter,
    ) -> Self {
        Self { backend, read_metadata, write_metadata, write_lock: Mutex::new(()) }
    }

    /// Returns the current verified metadata set.
    #[must_use]
    pub fn metadata(&self) -> Vec<FileMetadata> {
        (self.read_metadata)()
    }

    /// Reads a file, verifying it against its recorded checksum.
    ///
    /// # Errors
    ///
    /// - [`StorageError::MetadataNotFound`] if the file was never stored
    /// - [`StorageError::BlobNotFound`] if the backend lost the data
    /// - [`StorageError::ChecksumMismatch`] if the stored bytes are corrupt
    pub async fn read_file(&self, name: &str, chain_id: &str) -> Result<Vec<u8>, StorageError> {
        let key = FileKey::new(name, chain_id);
        let metadata = self
            .metadata()
            .into_iter()
            .find(|entry| entry.name == name && entry.chain_id == chain_id)
            .ok_or_else(|| StorageError::MetadataNotFound(key.clone()))?;

        let data =
            self.backend.read(&key).await?.ok_or_else(|| StorageError::BlobNotFound(key.clone()))?;

        integrity::ensure_checksum(&data, &metadata.checksum)
            .map_err(|source| StorageError::ChecksumMismatch { key, source })?;

        Ok(data)
    }

    /// Stores a file after verifying it against the provided checksum and
    /// upserts its metadata entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ChecksumMismatch`] before touching the backend
    /// if the data does not match `request.checksum`, or a backend error.
    pub async fn write_file(&self, request: WriteRequest) -> Result<(), StorageError> {
        let WriteRequest { data, name, chain_id, version, checksum } = request;
        let key = FileKey::new(&name, &chain_id);

        integrity::ensure_checksum(&data, &checksum)
            .map_err(|source| StorageError::ChecksumMismatch { key: key.clone(), source })?;

        let _guard = self.write_lock.lock().await;
        self.backend.write(&key, data).await?;

        let mut metadata = self.metadata();
        let entry = FileMetadata { name, chain_id, version, checksum };
        match metadata.iter_mut().find(|m| m.name == entry.name && m.chain_id == entry.chain_id) {
            Some(existing) => *existing = entry,
            None => metadata.push(entry),
        }
        (self.write_metadata)(metadata);

        trace!(file = %key, "verified file written");
        Ok(())
    }

    /// Reconciles local metadata and backend contents against `manifest`.
    ///
    /// An entry survives only if its file still reads back verified and the
    /// manifest lists exactly its `(name, chain_id, version, checksum)`.
    /// Stored blobs without a surviving entry are deleted. Per-entry read
    /// failures mean "stale" and are not propagated.
    ///
    /// Running this twice with the same manifest deletes nothing the second time.
    /// A blob that cannot be deleted is logged and retried on the next pass.
    ///
    /// # Errors
    ///
    /// Returns a backend error only if listing fails.
    pub async fn sync_metadata(
        &self,
        manifest: &[FileDescriptor],
    ) -> Result<Vec<FileMetadata>, StorageError> {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.backend.remove_incomplete().await {
            warn!(error = %e, "failed to remove interrupted writes");
        }

        let mut surviving = Vec::new();
        for entry in self.metadata() {
            if let Err(e) = self.read_file(&entry.name, &entry.chain_id).await {
                debug!(file = %entry.key(), error = %e, "dropping unreadable file metadata");
                continue;
            }
            if !manifest.iter().any(|descriptor| descriptor.matches(&entry)) {
                debug!(file = %entry.key(), version = %entry.version, "dropping stale file metadata");
                continue;
            }
            surviving.push(entry);
        }

        let keep: HashSet<FileKey> = surviving.iter().map(FileMetadata::key).collect();
        let mut deleted = 0;
        for key in self.backend.dir().await? {
            if !keep.contains(&key) {
                warn!(file = %key, "deleting orphaned file from storage");
                match self.backend.delete(&key).await {
                    Ok(()) => deleted += 1,
                    Err(e) => warn!(file = %key, error = %e, "failed to delete orphaned file"),
                }
            }
        }
        if deleted > 0 {
            metrics::record_orphans_deleted(deleted);
        }

        (self.write_metadata)(surviving.clone());
        Ok(surviving)
    }

    /// Returns the manifest entries for `chain_id` that have no exactly
    /// matching verified metadata entry.
    #[must_use]
    pub fn missing_files(&self, manifest: &[FileDescriptor], chain_id: &str) -> Vec<FileDescriptor> {
        let metadata = self.metadata();
        manifest
            .iter()
            .filter(|descriptor| descriptor.chain_id == chain_id)
            .filter(|descriptor| !metadata.iter().any(|entry| descriptor.matches(entry)))
            .cloned()
            .collect()
    }
}
