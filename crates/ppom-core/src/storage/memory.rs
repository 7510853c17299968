use async_trait::async_trait;
use dashmap::DashMap;

use super::{StorageBackend, StorageError};
use crate::types::FileKey;

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    blobs: DashMap<FileKey, Vec<u8>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Overwrites a blob without any verification. Test hook for corrupting data.
    #[doc(hidden)]
    pub fn insert_raw(&self, key: FileKey, data: Vec<u8>) {
        self.blobs.insert(key, data);
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn read(&self, key: &FileKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, key: &FileKey, data: Vec<u8>) -> Result<(), StorageError> {
        self.blobs.insert(key.clone(), data);
        Ok(())
    }

    async fn delete(&self, key: &FileKey) -> Result<(), StorageError> {
        self.blobs.remove(key);
        Ok(())
    }

    async fn dir(&self) -> Result<Vec<FileKey>, StorageError> {
        Ok(self.blobs.iter().map(|entry| entry.key().clone()).collect())
    }
}
