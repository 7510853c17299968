use std::sync::Arc;
use tracing::{debug, info};

use super::{
    errors::ManifestError,
    fetcher::{FetchResponse, Fetcher},
};
use crate::{
    chain::ChainActivityCache,
    integrity,
    metrics::{self, FetchMode},
    state::StateStore,
    storage::{VerifiedStorage, WriteRequest},
    types::{is_safe_file_path, FileDescriptor, MANIFEST_FILE_NAME},
};

/// Result of a conditional manifest fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestFetch {
    /// The server's revalidation token equals the cached one; nothing was downloaded.
    Unchanged,
    /// A full fetch happened.
    Changed { manifest: Vec<FileDescriptor>, etag: Option<String> },
}

/// Result of [`ManifestSync::update_all`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncOutcome {
    #[default]
    Unchanged,
    /// The manifest changed. `backlog` lists files missing for tracked chains.
    Updated { backlog: Vec<FileDescriptor> },
}

impl SyncOutcome {
    /// Files that still have to be fetched; empty when unchanged.
    #[must_use]
    pub fn into_backlog(self) -> Vec<FileDescriptor> {
        match self {
            Self::Unchanged => Vec::new(),
            Self::Updated { backlog } => backlog,
        }
    }
}

/// Keeps the local manifest and verified storage in step with the CDN.
pub struct ManifestSync {
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<VerifiedStorage>,
    chains: ChainActivityCache,
    state: Arc<StateStore>,
    cdn_base_url: String,
    public_key: String,
}

impl ManifestSync {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<VerifiedStorage>,
        chains: ChainActivityCache,
        state: Arc<StateStore>,
        cdn_base_url: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            storage,
            chains,
            state,
            cdn_base_url: cdn_base_url.into(),
            public_key: public_key.into(),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<VerifiedStorage> {
        &self.storage
    }

    #[must_use]
    pub fn chains(&self) -> &ChainActivityCache {
        &self.chains
    }

    /// Last successfully fetched manifest.
    #[must_use]
    pub fn manifest(&self) -> Vec<FileDescriptor> {
        self.state.snapshot().version_info.clone()
    }

    /// Manifest entries for `chain_id`.
    #[must_use]
    pub fn files_for_chain(&self, chain_id: &str) -> Vec<FileDescriptor> {
        self.state
            .snapshot()
            .version_info
            .iter()
            .filter(|descriptor| descriptor.chain_id == chain_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn manifest_url(&self) -> String {
        self.file_url(MANIFEST_FILE_NAME)
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.cdn_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Fetches the manifest unless the server's revalidation token matches
    /// the cached one.
    ///
    /// A missing token on either side always means a full fetch. The cached
    /// token is not touched here; [`Self::update_all`] stores it once the
    /// manifest has been applied.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::ManifestFetchFailed`] on transport failure or a non-2xx status
    /// - [`ManifestError::InvalidManifest`] if the body does not parse
    pub async fn fetch_manifest(&self) -> Result<ManifestFetch, ManifestError> {
        let url = self.manifest_url();
        let cached = self.state.snapshot().version_file_etag.clone();

        let head = self
            .fetcher
            .head(&url, &[("Content-Type", "application/json")])
            .await
            .map_err(|e| ManifestError::manifest_transport(&e))?;
        ensure_manifest_success(&head)?;

        if let (Some(cached), Some(current)) = (cached.as_deref(), head.etag.as_deref()) {
            if cached == current {
                debug!(etag = %current, "manifest unchanged");
                return Ok(ManifestFetch::Unchanged);
            }
        }

        let response =
            self.fetcher.get(&url).await.map_err(|e| ManifestError::manifest_transport(&e))?;
        ensure_manifest_success(&response)?;

        let manifest: Vec<FileDescriptor> = serde_json::from_slice(&response.body)
            .map_err(|e| ManifestError::InvalidManifest(e.to_string()))?;

        Ok(ManifestFetch::Changed { manifest, etag: response.etag.or(head.etag) })
    }

    /// Downloads one data file and checks its signature.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::InvalidFilePath`] before any network access if the
    ///   path has characters outside `[A-Za-z0-9_./]` or a `..` segment
    /// - [`ManifestError::FileFetchFailed`] on transport failure or a non-2xx status
    /// - [`ManifestError::Integrity`] if the signature does not verify
    pub async fn fetch_and_verify_file(
        &self,
        descriptor: &FileDescriptor,
    ) -> Result<Vec<u8>, ManifestError> {
        let path = descriptor.file_path.as_str();
        if !is_safe_file_path(path) {
            return Err(ManifestError::InvalidFilePath(path.to_string()));
        }

        let response = self
            .fetcher
            .get(&self.file_url(path))
            .await
            .map_err(|e| ManifestError::file_transport(path, &e))?;
        if !response.is_success() {
            return Err(ManifestError::file_status(path, response.status));
        }

        integrity::verify_signature(&response.body, &descriptor.signature, &self.public_key, path)?;
        Ok(response.body)
    }

    /// Fetches, verifies and stores one file.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::fetch_and_verify_file`] or the checksum-gated write.
    pub async fn fetch_and_store(
        &self,
        descriptor: &FileDescriptor,
        mode: FetchMode,
    ) -> Result<(), ManifestError> {
        let result = async {
            let data = self.fetch_and_verify_file(descriptor).await?;
            self.storage.write_file(WriteRequest::for_descriptor(descriptor, data)).await?;
            Ok::<(), ManifestError>(())
        }
        .await;

        match &result {
            Ok(()) => {
                metrics::record_file_fetch(mode, "ok");
                debug!(file = %descriptor.key(), version = %descriptor.version, "data file stored");
            }
            Err(_) => metrics::record_file_fetch(mode, "failed"),
        }
        result
    }

    /// Syncs the manifest and reconciles storage against it.
    ///
    /// On a change, storage is reconciled first; the manifest and its token
    /// are recorded only after that succeeds, so a failed sync is retried in
    /// full by the next call. Every tracked chain that now misses a file is
    /// flagged as needing data.
    ///
    /// # Errors
    ///
    /// Returns any manifest fetch error, which leaves state unmodified, or a
    /// storage backend error from reconciliation.
    pub async fn update_all(&self) -> Result<SyncOutcome, ManifestError> {
        let result = self.apply_manifest().await;
        match &result {
            Ok(SyncOutcome::Unchanged) => metrics::record_manifest_sync("unchanged"),
            Ok(SyncOutcome::Updated { .. }) => metrics::record_manifest_sync("updated"),
            Err(_) => metrics::record_manifest_sync("failed"),
        }
        result
    }

    async fn apply_manifest(&self) -> Result<SyncOutcome, ManifestError> {
        let (manifest, etag) = match self.fetch_manifest().await? {
            ManifestFetch::Unchanged => return Ok(SyncOutcome::Unchanged),
            ManifestFetch::Changed { manifest, etag } => (manifest, etag),
        };

        let surviving = self.storage.sync_metadata(&manifest).await?;
        let files = manifest.len();
        self.state.update(|state| {
            state.version_info = manifest;
            state.version_file_etag = etag;
        });

        let backlog = self.pending_files();
        info!(files, verified = surviving.len(), backlog = backlog.len(), "manifest updated");
        Ok(SyncOutcome::Updated { backlog })
    }

    /// Manifest files missing from storage for every tracked chain.
    ///
    /// Chains with missing files are flagged as needing data.
    #[must_use]
    pub fn pending_files(&self) -> Vec<FileDescriptor> {
        let manifest = self.manifest();
        let mut backlog = Vec::new();
        for chain_id in self.chains.tracked_chains() {
            let missing = self.storage.missing_files(&manifest, &chain_id);
            if !missing.is_empty() {
                self.chains.mark_needs_data(&chain_id);
                backlog.extend(missing);
            }
        }
        backlog
    }
}

fn ensure_manifest_success(response: &FetchResponse) -> Result<(), ManifestError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ManifestError::manifest_status(response.status))
    }
}
