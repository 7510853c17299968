use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use super::{StorageBackend, StorageError};
use crate::types::FileKey;

/// Suffix of in-flight writes. `%p` is never produced by [`encode_segment`],
/// so a temporary file can never collide with a stored key.
const PARTIAL_SUFFIX: &str = "%partial";

/// File-system storage backend.
///
/// Each key is stored at `<root>/<chain_id>/<name>`, with both components
/// percent-encoded into a single path segment. A leading dot is encoded too,
/// so no key can address anything outside `root` or hide behind `.`/`..`.
/// Entries on disk that are not in canonical encoded form are not addressable
/// as keys and are left out of [`StorageBackend::dir`].
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &FileKey) -> Result<PathBuf, StorageError> {
        if key.chain_id.is_empty() || key.name.is_empty() {
            return Err(StorageError::InvalidKey(key.clone()));
        }
        Ok(self.root.join(encode_segment(&key.chain_id)).join(encode_segment(&key.name)))
    }

    /// Lists `(decoded chain id, directory)` for every addressable chain directory.
    async fn chain_dirs(&self) -> Result<Vec<(String, PathBuf)>, StorageError> {
        let mut dirs = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let raw = entry.file_name();
            match raw.to_str().and_then(decode_segment) {
                Some(chain_id) => dirs.push((chain_id, entry.path())),
                None => debug!(path = %entry.path().display(), "skipping unaddressable directory"),
            }
        }

        Ok(dirs)
    }
}

fn encode_segment(segment: &str) -> String {
    let encoded = urlencoding::encode(segment);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

fn decode_segment(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.is_empty() || encode_segment(&decoded) != raw {
        return None;
    }
    Some(decoded.into_owned())
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    async fn read(&self, key: &FileKey) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &FileKey, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write to a sibling and rename so readers never see a partial file.
        let tmp = path.with_file_name(format!("{}{PARTIAL_SUFFIX}", encode_segment(&key.name)));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &FileKey) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn dir(&self) -> Result<Vec<FileKey>, StorageError> {
        let mut keys = Vec::new();
        for (chain_id, path) in self.chain_dirs().await? {
            let mut files = tokio::fs::read_dir(&path).await?;
            while let Some(file) = files.next_entry().await? {
                if !file.file_type().await?.is_file() {
                    continue;
                }
                let raw = file.file_name();
                let Some(raw) = raw.to_str() else {
                    warn!(path = %file.path().display(), "skipping non UTF-8 file name");
                    continue;
                };
                if raw.ends_with(PARTIAL_SUFFIX) {
                    continue;
                }
                match decode_segment(raw) {
                    Some(name) => keys.push(FileKey::new(name, chain_id.clone())),
                    None => warn!(path = %file.path().display(), "skipping unaddressable file"),
                }
            }
        }

        Ok(keys)
    }

    async fn remove_incomplete(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for (_, path) in self.chain_dirs().await? {
            let mut files = tokio::fs::read_dir(&path).await?;
            while let Some(file) = files.next_entry().await? {
                let is_partial =
                    file.file_name().to_str().is_some_and(|name| name.ends_with(PARTIAL_SUFFIX));
                if !is_partial || !file.file_type().await?.is_file() {
                    continue;
                }
                match tokio::fs::remove_file(file.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        if removed > 0 {
            debug!(removed, "removed leftovers of interrupted writes");
        }
        Ok(removed)
    }
}
