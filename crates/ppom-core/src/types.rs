//! Shared data types for manifest entries, verified file metadata and storage keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the manifest file published at the root of the CDN.
pub const MANIFEST_FILE_NAME: &str = "ppom_version.json";

/// Read-only chain query methods the analysis engine may relay to the provider.
pub const ALLOWED_PROVIDER_METHODS: &[&str] = &[
    "eth_call",
    "eth_blockNumber",
    "eth_createAccessList",
    "eth_getLogs",
    "eth_getFilterLogs",
    "eth_getTransactionByHash",
    "eth_chainId",
    "eth_getBlockByHash",
    "eth_getBlockByNumber",
    "eth_getCode",
    "eth_getStorageAt",
    "eth_getBalance",
    "eth_getTransactionCount",
    "trace_call",
    "trace_callMany",
    "debug_traceCall",
    "trace_filter",
];

/// Returns `true` if `method` may be relayed to the provider.
#[inline]
#[must_use]
pub fn is_method_allowed(method: &str) -> bool {
    ALLOWED_PROVIDER_METHODS.contains(&method)
}

/// Remote manifest entry describing one data file.
///
/// Produced by the manifest fetch and never mutated afterwards; a successful
/// sync replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub chain_id: String,
    pub version: String,
    pub checksum: String,
    pub file_path: String,
    pub signature: String,
}

impl FileDescriptor {
    /// Storage key for this file.
    #[must_use]
    pub fn key(&self) -> FileKey {
        FileKey::new(&self.name, &self.chain_id)
    }

    /// Returns `true` if `metadata` describes exactly this file version.
    #[must_use]
    pub fn matches(&self, metadata: &FileMetadata) -> bool {
        self.name == metadata.name &&
            self.chain_id == metadata.chain_id &&
            self.version == metadata.version &&
            self.checksum == metadata.checksum
    }
}

/// Locally verified metadata for a file present in the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub chain_id: String,
    pub version: String,
    pub checksum: String,
}

impl FileMetadata {
    #[must_use]
    pub fn key(&self) -> FileKey {
        FileKey::new(&self.name, &self.chain_id)
    }
}

impl From<&FileDescriptor> for FileMetadata {
    fn from(descriptor: &FileDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            chain_id: descriptor.chain_id.clone(),
            version: descriptor.version.clone(),
            checksum: descriptor.checksum.clone(),
        }
    }
}

/// Storage backend key: a file name scoped to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileKey {
    pub name: String,
    pub chain_id: String,
}

impl FileKey {
    #[must_use]
    pub fn new(name: impl Into<String>, chain_id: impl Into<String>) -> Self {
        Self { name: name.into(), chain_id: chain_id.into() }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chain_id, self.name)
    }
}

/// Returns `true` if `path` only contains word characters, dots and slashes
/// and has no parent-directory segment.
#[must_use]
pub fn is_safe_file_path(path: &str) -> bool {
    !path.is_empty() &&
        path.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '/') &&
        !path.split('/').any(|segment| segment == "..")
}
