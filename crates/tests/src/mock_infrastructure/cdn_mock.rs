//! CDN Mock Builder
//!
//! Serves `ppom_version.json` (HEAD and GET, with an `ETag`) and data files.

use mockito::{Mock, Server, ServerGuard};
use ppom_core::types::{FileDescriptor, MANIFEST_FILE_NAME};

/// HEAD and GET mocks for one manifest version.
pub struct ManifestMocks {
    pub head: Mock,
    pub get: Mock,
}

impl ManifestMocks {
    /// Removes both mocks so a later manifest version can be served.
    pub async fn remove(self) {
        self.head.remove_async().await;
        self.get.remove_async().await;
    }
}

/// Builder for a mocked PPOM CDN.
pub struct CdnMockBuilder {
    server: ServerGuard,
}

impl CdnMockBuilder {
    /// Creates a builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await }
    }

    /// Base URL to configure as `cdn.base_url`.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Serves `manifest` with the revalidation token `etag`.
    ///
    /// # Panics
    ///
    /// Panics if the manifest cannot be serialized.
    pub async fn mock_manifest(&mut self, manifest: &[FileDescriptor], etag: &str) -> ManifestMocks {
        let path = format!("/{MANIFEST_FILE_NAME}");
        let head = self
            .server
            .mock("HEAD", path.as_str())
            .with_status(200)
            .with_header("etag", etag)
            .create_async()
            .await;
        let get = self
            .server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("etag", etag)
            .with_body(serde_json::to_vec(manifest).expect("manifest serializes"))
            .create_async()
            .await;
        ManifestMocks { head, get }
    }

    /// Answers every manifest request with `status`.
    pub async fn mock_manifest_status(&mut self, status: usize) -> ManifestMocks {
        let path = format!("/{MANIFEST_FILE_NAME}");
        let head = self.server.mock("HEAD", path.as_str()).with_status(status).create_async().await;
        let get = self.server.mock("GET", path.as_str()).with_status(status).create_async().await;
        ManifestMocks { head, get }
    }

    /// Announces a new manifest version `etag` on HEAD but fails the download.
    pub async fn mock_manifest_download_failure(&mut self, etag: &str, status: usize) -> ManifestMocks {
        let path = format!("/{MANIFEST_FILE_NAME}");
        let head = self
            .server
            .mock("HEAD", path.as_str())
            .with_status(200)
            .with_header("etag", etag)
            .create_async()
            .await;
        let get = self.server.mock("GET", path.as_str()).with_status(status).create_async().await;
        ManifestMocks { head, get }
    }

    /// Serves `data` at the descriptor's file path.
    pub async fn mock_file(&mut self, descriptor: &FileDescriptor, data: &[u8]) -> Mock {
        self.server
            .mock("GET", format!("/{}", descriptor.file_path).as_str())
            .with_status(200)
            .with_body(data)
            .create_async()
            .await
    }
}
