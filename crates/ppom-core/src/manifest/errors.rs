use thiserror::Error;

use super::fetcher::FetchError;
use crate::{integrity::IntegrityError, storage::StorageError};

/// Errors raised while syncing the manifest or fetching data files.
///
/// None of these are retried inline; the next scheduled tick or periodic
/// sync is the retry.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest endpoint was unreachable or returned a non-2xx status.
    #[error("failed to fetch manifest: {reason}")]
    ManifestFetchFailed { status: Option<u16>, reason: String },

    /// The manifest body is not a JSON array of file descriptors.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A data file was unreachable or returned a non-2xx status.
    #[error("failed to fetch file {path}: {reason}")]
    FileFetchFailed { path: String, reason: String },

    /// A descriptor's file path is outside the allowed character set.
    #[error("invalid file path: {0:?}")]
    InvalidFilePath(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ManifestError {
    pub(crate) fn manifest_transport(error: &FetchError) -> Self {
        Self::ManifestFetchFailed { status: None, reason: error.to_string() }
    }

    pub(crate) fn manifest_status(status: u16) -> Self {
        Self::ManifestFetchFailed { status: Some(status), reason: format!("HTTP {status}") }
    }

    pub(crate) fn file_transport(path: &str, error: &FetchError) -> Self {
        Self::FileFetchFailed { path: path.to_string(), reason: error.to_string() }
    }

    pub(crate) fn file_status(path: &str, status: u16) -> Self {
        Self::FileFetchFailed { path: path.to_string(), reason: format!("HTTP {status}") }
    }
}
