use thiserror::Error;

use crate::{integrity::IntegrityError, types::FileKey};

/// Errors raised by [`super::VerifiedStorage`] and the storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No verified metadata is recorded for the key.
    #[error("no metadata found for {0}")]
    MetadataNotFound(FileKey),

    /// Metadata exists but the backend holds no data for the key.
    #[error("storage backend has no data for {0}")]
    BlobNotFound(FileKey),

    /// Stored or incoming data failed the checksum gate.
    #[error("checksum mismatch for {key}: {source}")]
    ChecksumMismatch {
        key: FileKey,
        #[source]
        source: IntegrityError,
    },

    /// Key cannot be mapped onto the backend safely.
    #[error("invalid storage key: {0}")]
    InvalidKey(FileKey),

    /// The backend failed to complete an operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        Self::Backend(error.to_string())
    }
}
