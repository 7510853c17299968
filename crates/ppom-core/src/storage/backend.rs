use async_trait::async_trait;

use super::StorageError;
use crate::types::FileKey;

/// Key/value blob store holding raw data files.
///
/// Implementations do no verification; [`super::VerifiedStorage`] is the only
/// component that should talk to a backend directly.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns the stored bytes, or `None` if nothing is stored under `key`.
    async fn read(&self, key: &FileKey) -> Result<Option<Vec<u8>>, StorageError>;

    async fn write(&self, key: &FileKey, data: Vec<u8>) -> Result<(), StorageError>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &FileKey) -> Result<(), StorageError>;

    /// Lists every key currently stored.
    async fn dir(&self) -> Result<Vec<FileKey>, StorageError>;

    /// Removes leftovers of interrupted writes, returning how many were found.
    async fn remove_incomplete(&self) -> Result<usize, StorageError> {
        Ok(0)
    }
}
